// Database models - Re-exports all domain-specific models
//
// - settings.rs: Application settings

mod settings;

pub use settings::OnboardingSettings;
