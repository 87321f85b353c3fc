use crate::models::{EnergyFactorTable, Footprint, UserConfig};

/// Converts a token count into energy and CO2 estimates using the
/// per-model coefficient table.
///
/// Pure arithmetic: no I/O, deterministic for a given table and grid
/// intensity.
#[derive(Debug, Clone)]
pub struct EnergyModel {
    table: EnergyFactorTable,
    grid_co2_intensity: f64,
}

impl EnergyModel {
    pub fn new(table: EnergyFactorTable, grid_co2_intensity: f64) -> Self {
        Self {
            table,
            grid_co2_intensity,
        }
    }

    pub fn from_config(config: &UserConfig) -> Self {
        Self::new(config.energy_factors.clone(), config.grid_co2_intensity)
    }

    /// Estimate the footprint of a call. Unknown models use the table's
    /// default coefficient, so this always produces a numeric result.
    pub fn estimate(&self, total_tokens: u64, model: &str) -> Footprint {
        let coefficient = self.table.factor_for(model);
        let energy_kwh = (total_tokens as f64 / 1000.0) * coefficient;
        Footprint {
            energy_kwh,
            co2_kg: energy_kwh * self.grid_co2_intensity,
        }
    }

    pub fn table(&self) -> &EnergyFactorTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn model_a_table() -> EnergyFactorTable {
        let mut factors = HashMap::new();
        factors.insert("modelA".to_string(), 0.0004);
        EnergyFactorTable {
            factors,
            default_factor: 0.0003,
        }
    }

    #[test]
    fn known_model_applies_per_1k_token_coefficient() {
        let model = EnergyModel::new(model_a_table(), 0.4);
        let footprint = model.estimate(1000, "modelA");
        assert!((footprint.energy_kwh - 0.0004).abs() < 1e-12);
        assert!((footprint.co2_kg - 0.00016).abs() < 1e-12);
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let model = EnergyModel::new(model_a_table(), 0.4);
        let footprint = model.estimate(2000, "never-heard-of-it");
        assert!((footprint.energy_kwh - 0.0006).abs() < 1e-12);
    }

    #[test]
    fn zero_tokens_is_zero_footprint() {
        let model = EnergyModel::new(model_a_table(), 0.4);
        let footprint = model.estimate(0, "modelA");
        assert_eq!(footprint.energy_kwh, 0.0);
        assert_eq!(footprint.co2_kg, 0.0);
    }

    #[test]
    fn co2_is_exactly_energy_times_grid_intensity() {
        let model = EnergyModel::new(model_a_table(), 0.4);
        for tokens in [1u64, 37, 999, 12_345] {
            let footprint = model.estimate(tokens, "modelA");
            assert_eq!(footprint.co2_kg, footprint.energy_kwh * 0.4);
            assert!(footprint.energy_kwh >= 0.0);
        }
    }
}
