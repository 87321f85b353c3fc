pub mod api;
pub mod credentials;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// One completed chat-completion call with its token usage and
/// estimated energy/CO2 footprint
#[derive(Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// 1-based sequence number within the session
    pub id: u64,
    pub model: String,
    pub prompt: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// Estimated energy in kWh, derived from the token count
    pub energy_kwh: f64,
    /// Estimated CO2 in kg, derived from the energy estimate
    pub co2_kg: f64,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Debug for QueryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRecord")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("prompt", &"[REDACTED]") // Redact user text for privacy
            .field("input_tokens", &self.input_tokens)
            .field("output_tokens", &self.output_tokens)
            .field("total_tokens", &self.total_tokens)
            .field("energy_kwh", &self.energy_kwh)
            .field("co2_kg", &self.co2_kg)
            .field("response", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Energy and CO2 estimate for a single call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub energy_kwh: f64,
    pub co2_kg: f64,
}

/// Per-model energy coefficients in kWh per 1000 tokens, with a fallback
/// for models that are not listed.
///
/// The values are configuration data of unspecified provenance, not
/// validated physical fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyFactorTable {
    pub factors: HashMap<String, f64>,
    pub default_factor: f64,
}

impl EnergyFactorTable {
    /// Coefficient for a model, falling back to the default. Never fails.
    pub fn factor_for(&self, model: &str) -> f64 {
        self.factors.get(model).copied().unwrap_or(self.default_factor)
    }

    pub fn is_known(&self, model: &str) -> bool {
        self.factors.contains_key(model)
    }

    /// Model identifiers in a stable display order
    pub fn known_models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.factors.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }
}

impl Default for EnergyFactorTable {
    fn default() -> Self {
        let mut factors = HashMap::new();
        factors.insert("x-ai/grok-4-fast:free".to_string(), 0.0004);
        factors.insert("openai/gpt-oss-20b:free".to_string(), 0.0003);
        factors.insert("google/gemma-3n-e4b-it:free".to_string(), 0.0002);
        factors.insert("meta-llama/llama-4-maverick:free".to_string(), 0.0005);
        Self {
            factors,
            default_factor: 0.0003,
        }
    }
}

/// User configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub default_model: String,
    /// Base URL of the chat-completion API, without the request path
    pub endpoint_url: String,
    pub timeout_seconds: u64,
    /// Grid carbon intensity in kg CO2 per kWh
    pub grid_co2_intensity: f64,
    pub energy_factors: EnergyFactorTable,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_model: "x-ai/grok-4-fast:free".to_string(),
            endpoint_url: "https://openrouter.ai/api/v1".to_string(),
            timeout_seconds: 30,
            grid_co2_intensity: 0.4,
            energy_factors: EnergyFactorTable::default(),
        }
    }
}

impl UserConfig {
    /// Load the config file, creating it with defaults on first run
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
