//! # FollowUp Providers
//!
//! Message composers. Every hosted LLM that speaks the OpenAI chat
//! completions dialect (Groq, OpenAI, OpenRouter, Ollama, custom endpoints)
//! is served by a single [`OpenAiComposer`]. [`templates`] holds the
//! deterministic copy used when no composer is reachable.

pub mod openai_compatible;
pub mod prompt;
pub mod templates;

pub use openai_compatible::OpenAiComposer;

use followup_core::config::ComposerConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::MessageComposer;

/// Known OpenAI-compatible endpoints. `custom` uses `base_url` from config.
const KNOWN_ENDPOINTS: &[(&str, &str)] = &[
    ("groq", "https://api.groq.com/openai/v1"),
    ("openai", "https://api.openai.com/v1"),
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("ollama", "http://localhost:11434/v1"),
];

/// Create a composer from configuration.
///
/// An explicitly configured `base_url` always wins over the registry
/// default, which lets `groq` point at a proxy.
pub fn create_composer(config: &ComposerConfig) -> Result<Box<dyn MessageComposer>> {
    let provider = config.provider.as_str();
    let registry_url = KNOWN_ENDPOINTS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, url)| *url);

    let base_url = match (provider, registry_url) {
        ("custom", _) => config.base_url.clone(),
        (_, Some(url)) if config.base_url.is_empty() => url.to_string(),
        (_, Some(_)) => config.base_url.clone(),
        (other, None) => {
            return Err(FollowUpError::Config(format!(
                "unknown composer provider '{other}' (known: {})",
                available_providers().join(", ")
            )));
        }
    };

    Ok(Box::new(OpenAiComposer::new(provider, base_url, config)))
}

/// All composer provider names.
fn available_providers() -> Vec<&'static str> {
    let mut names: Vec<&str> = KNOWN_ENDPOINTS.iter().map(|(n, _)| *n).collect();
    names.push("custom");
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_known_provider() {
        let composer = create_composer(&ComposerConfig::default()).unwrap();
        assert_eq!(composer.name(), "groq");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ComposerConfig {
            provider: "nope".into(),
            ..ComposerConfig::default()
        };
        let err = create_composer(&config).err().unwrap();
        assert!(err.to_string().contains("known: groq, openai, openrouter, ollama, custom"));
    }

    #[test]
    fn test_available_providers_include_custom() {
        let names = available_providers();
        assert!(names.contains(&"groq"));
        assert!(names.contains(&"custom"));
    }
}
