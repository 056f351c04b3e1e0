// Database models - Settings

/// Settings the onboarding workflow reads and its caller writes back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnboardingSettings {
    pub ai_api_url: Option<String>,
    pub ai_model: Option<String>,
}
