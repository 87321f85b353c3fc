use crate::models::QueryRecord;
use std::collections::HashMap;

/// Summary statistics over the session history.
///
/// All fields are zero when the history is empty; consumers check `count`
/// before rendering KPIs or charts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryStats {
    pub count: usize,
    pub total_energy_kwh: f64,
    pub total_co2_kg: f64,
    pub avg_tokens: f64,
    pub avg_co2_kg: f64,
    pub median_co2_kg: f64,
}

/// Compute summary statistics. Pure and recomputed on demand; an empty
/// slice yields the well-defined zero state.
pub fn stats(records: &[QueryRecord]) -> HistoryStats {
    if records.is_empty() {
        return HistoryStats::default();
    }

    let count = records.len();
    let total_energy_kwh: f64 = records.iter().map(|r| r.energy_kwh).sum();
    let total_co2_kg: f64 = records.iter().map(|r| r.co2_kg).sum();
    let total_tokens: u64 = records.iter().map(|r| r.total_tokens).sum();

    let mut co2_values: Vec<f64> = records.iter().map(|r| r.co2_kg).collect();

    HistoryStats {
        count,
        total_energy_kwh,
        total_co2_kg,
        avg_tokens: total_tokens as f64 / count as f64,
        avg_co2_kg: total_co2_kg / count as f64,
        median_co2_kg: median(&mut co2_values),
    }
}

/// CO2 per model, descending by share, for share-of-total charting
pub fn co2_by_model(records: &[QueryRecord]) -> Vec<(String, f64)> {
    let mut grouped: HashMap<&str, f64> = HashMap::new();
    for record in records {
        *grouped.entry(record.model.as_str()).or_insert(0.0) += record.co2_kg;
    }

    let mut groups: Vec<(String, f64)> = grouped
        .into_iter()
        .map(|(model, co2)| (model.to_string(), co2))
        .collect();
    groups.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    groups
}

/// Per-query series of (id, input_tokens, output_tokens)
pub fn token_series(records: &[QueryRecord]) -> Vec<(u64, u64, u64)> {
    records
        .iter()
        .map(|r| (r.id, r.input_tokens, r.output_tokens))
        .collect()
}

/// Per-query series of (id, total_tokens, model)
pub fn total_token_series(records: &[QueryRecord]) -> Vec<(u64, u64, String)> {
    records
        .iter()
        .map(|r| (r.id, r.total_tokens, r.model.clone()))
        .collect()
}

/// (total_tokens, co2_kg, model) pairs for tokens-vs-CO2 correlation
pub fn correlation_series(records: &[QueryRecord]) -> Vec<(u64, f64, String)> {
    records
        .iter()
        .map(|r| (r.total_tokens, r.co2_kg, r.model.clone()))
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_averages_the_middle_pair() {
        let mut values = vec![0.4, 0.1, 0.3, 0.2];
        assert!((median(&mut values) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn median_of_odd_count_picks_the_middle() {
        let mut values = vec![0.3, 0.1, 0.2];
        assert!((median(&mut values) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_history_yields_zero_state() {
        let computed = stats(&[]);
        assert_eq!(computed, HistoryStats::default());
        assert!(co2_by_model(&[]).is_empty());
        assert!(token_series(&[]).is_empty());
        assert!(correlation_series(&[]).is_empty());
    }
}
