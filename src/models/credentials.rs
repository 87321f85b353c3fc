use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Where an API key can come from, in order of preference
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Provided directly via --api-key
    Direct(String),
    /// Load from environment variable
    Environment(String),
    /// Load from a key file in the data directory
    KeyFile(PathBuf),
}

/// Credential resolution across the supported sources.
///
/// The key itself is never logged or displayed; diagnostics only ever
/// mention the source and the key length.
pub struct CredentialManager;

impl CredentialManager {
    /// Resolve an API key, trying the direct flag first and then the
    /// fallback sources in order.
    pub fn load_credentials(direct: Option<&str>, data_dir: &Path) -> Result<String> {
        let mut sources = Vec::new();
        if let Some(key) = direct {
            sources.push(CredentialSource::Direct(key.to_string()));
        }
        sources.extend(Self::fallback_sources(data_dir));

        for source in &sources {
            match Self::load_from_source(source) {
                Ok(key) => {
                    log::info!(
                        "Loaded API key from {} ({} chars)",
                        Self::describe(source),
                        key.len()
                    );
                    return Ok(key);
                }
                Err(e) => log::debug!("Credential source {} unavailable: {e}", Self::describe(source)),
            }
        }

        Err(anyhow!(
            "No API key found. Either:\n\
            1. Pass --api-key <KEY>\n\
            2. Set the OPENROUTER_API_KEY environment variable\n\
            3. Put the key in {}",
            Self::key_file_path(data_dir).display()
        ))
    }

    /// Load a key from a specific source
    pub fn load_from_source(source: &CredentialSource) -> Result<String> {
        let key = match source {
            CredentialSource::Direct(key) => key.clone(),
            CredentialSource::Environment(var) => std::env::var(var)
                .map_err(|_| anyhow!("environment variable {var} not set"))?,
            CredentialSource::KeyFile(path) => {
                if !path.exists() {
                    return Err(anyhow!("key file {} not found", path.display()));
                }
                std::fs::read_to_string(path)?
            }
        };

        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(anyhow!("credential from {} is empty", Self::describe(source)));
        }
        Ok(key)
    }

    /// Sources tried when no key is passed directly
    pub fn fallback_sources(data_dir: &Path) -> Vec<CredentialSource> {
        vec![
            CredentialSource::Environment("OPENROUTER_API_KEY".to_string()),
            CredentialSource::Environment("AI_ENERGY_MONITOR_API_KEY".to_string()),
            CredentialSource::KeyFile(Self::key_file_path(data_dir)),
        ]
    }

    pub fn key_file_path(data_dir: &Path) -> PathBuf {
        data_dir.join("api_key")
    }

    /// Human-readable source name, safe to log
    pub fn describe(source: &CredentialSource) -> String {
        match source {
            CredentialSource::Direct(_) => "--api-key flag".to_string(),
            CredentialSource::Environment(var) => format!("environment variable {var}"),
            CredentialSource::KeyFile(path) => format!("key file {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_key_is_trimmed() {
        let source = CredentialSource::Direct("  sk-test-123  ".to_string());
        assert_eq!(CredentialManager::load_from_source(&source).unwrap(), "sk-test-123");
    }

    #[test]
    fn empty_direct_key_is_rejected() {
        let source = CredentialSource::Direct("   ".to_string());
        assert!(CredentialManager::load_from_source(&source).is_err());
    }

    #[test]
    fn describe_never_contains_the_key() {
        let source = CredentialSource::Direct("sk-secret".to_string());
        assert!(!CredentialManager::describe(&source).contains("sk-secret"));
    }
}
