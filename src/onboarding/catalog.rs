//! Recommended model catalog

/// A model offered during onboarding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateModel {
    /// Engine tag, e.g. "llama3.2:3b"
    pub name: String,
    pub label: String,
    pub description: String,
}

/// A catalog entry as shown to the selection UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub model: CandidateModel,
    pub installed: bool,
}

impl CatalogEntry {
    pub fn display_label(&self) -> String {
        if self.installed {
            format!("{} ✓ installed", self.model.label)
        } else {
            self.model.label.clone()
        }
    }
}

/// Curated models, in presentation order. The first entry is the default choice.
pub fn candidate_models() -> Vec<CandidateModel> {
    vec![
        CandidateModel {
            name: "qwen2.5:3b".to_string(),
            label: "Qwen 2.5 3B".to_string(),
            description: "Lightning fast, low memory usage. Great for quick summaries.".to_string(),
        },
        CandidateModel {
            name: "llama3.2:3b".to_string(),
            label: "Llama 3.2 3B".to_string(),
            description: "Balanced performance. Good all-round task summaries.".to_string(),
        },
        CandidateModel {
            name: "deepseek-r1:8b".to_string(),
            label: "DeepSeek-R1 8B".to_string(),
            description: "Advanced reasoning and chain-of-thought. Best quality.".to_string(),
        },
    ]
}

/// Substring match so tagged variants ("llama3.2:3b-q4") count as installed
pub fn is_installed(model_name: &str, installed_models: &[String]) -> bool {
    installed_models.iter().any(|m| m.contains(model_name))
}

pub fn annotate(catalog: &[CandidateModel], installed_models: &[String]) -> Vec<CatalogEntry> {
    catalog
        .iter()
        .map(|model| CatalogEntry {
            installed: is_installed(&model.name, installed_models),
            model: model.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_uniqueness() {
        let names: Vec<_> = candidate_models().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["qwen2.5:3b", "llama3.2:3b", "deepseek-r1:8b"]);
    }

    #[test]
    fn test_tag_suffix_counts_as_installed() {
        let installed = vec!["llama3.2:3b-q4".to_string()];
        assert!(is_installed("llama3.2:3b", &installed));
        assert!(!is_installed("llama3.2:3b", &[]));
        assert!(!is_installed("qwen2.5:3b", &installed));
    }

    #[test]
    fn test_annotate_flags_and_labels() {
        let installed = vec!["qwen2.5:3b".to_string(), "mistral:7b".to_string()];
        let entries = annotate(&candidate_models(), &installed);

        assert_eq!(entries.len(), 3);
        assert!(entries[0].installed);
        assert_eq!(entries[0].display_label(), "Qwen 2.5 3B ✓ installed");
        assert!(!entries[1].installed);
        assert_eq!(entries[1].display_label(), "Llama 3.2 3B");
        assert!(!entries[2].installed);
    }
}
