pub mod ratatui_ui;

pub use ratatui_ui::DashboardUI;

use crate::models::{EnergyFactorTable, QueryRecord};
use crate::services::aggregator::HistoryStats;
use colored::Colorize;

/// Print the headline view of the most recent query: the response text
/// followed by a KPI row.
pub fn print_latest(record: &QueryRecord) {
    println!();
    println!(
        "{} {}",
        "AI Response".bright_cyan().bold(),
        format!(
            "(query #{}, {})",
            record.id,
            humantime::format_rfc3339_seconds(record.timestamp.into())
        )
        .bright_black()
    );
    println!("{}", record.response);
    println!();
    println!(
        "  {} {}   {} {}   {} {}   {} {}   {} {}",
        "Input:".bright_yellow(),
        record.input_tokens,
        "Output:".bright_yellow(),
        record.output_tokens,
        "Total:".bright_yellow(),
        record.total_tokens,
        "Energy (kWh):".bright_yellow(),
        format!("{:.6}", record.energy_kwh),
        "CO2 (kg):".bright_yellow(),
        format!("{:.6}", record.co2_kg),
    );
}

/// Print session-level aggregate statistics
pub fn print_stats(stats: &HistoryStats) {
    if stats.count == 0 {
        println!("{}", "No queries recorded yet".bright_yellow());
        return;
    }

    println!("{}", "Session Statistics".bright_cyan().bold());
    println!("  Queries:          {}", stats.count);
    println!("  Total Energy:     {:.6} kWh", stats.total_energy_kwh);
    println!("  Total CO2:        {:.6} kg", stats.total_co2_kg);
    println!("  Avg Tokens:       {:.1}", stats.avg_tokens);
    println!("  Avg CO2/prompt:   {:.6} kg", stats.avg_co2_kg);
    println!("  Median CO2/prompt: {:.6} kg", stats.median_co2_kg);
}

/// Print the full history as a box-drawing table
pub fn print_history_table(records: &[QueryRecord]) {
    if records.is_empty() {
        println!("{}", "No query history yet".bright_yellow());
        return;
    }

    println!("{}", format!("Query History ({} queries):", records.len()).bright_cyan().bold());
    println!("┌─────┬──────────────────────────────┬──────────────────────────┬─────────┬─────────┬─────────┬────────────┬────────────┐");
    println!("│ ID  │ Model                        │ Prompt                   │ Input   │ Output  │ Total   │ kWh        │ CO2 kg     │");
    println!("├─────┼──────────────────────────────┼──────────────────────────┼─────────┼─────────┼─────────┼────────────┼────────────┤");

    for record in records {
        println!(
            "│ {:<3} │ {:<28} │ {:<24} │ {:<7} │ {:<7} │ {:<7} │ {:<10.6} │ {:<10.6} │",
            record.id,
            truncate(&record.model, 28),
            truncate(&record.prompt, 24),
            record.input_tokens,
            record.output_tokens,
            record.total_tokens,
            record.energy_kwh,
            record.co2_kg,
        );
    }

    println!("└─────┴──────────────────────────────┴──────────────────────────┴─────────┴─────────┴─────────┴────────────┴────────────┘");
}

/// Print CO2 share per model as text bars
pub fn print_co2_share(groups: &[(String, f64)], total_co2_kg: f64) {
    if groups.is_empty() || total_co2_kg <= 0.0 {
        println!("{}", "No CO2 data yet".bright_yellow());
        return;
    }

    println!("{}", "CO2 Share by Model".bright_cyan().bold());
    for (model, co2) in groups {
        let share = co2 / total_co2_kg;
        println!(
            "  {:<32} {} {:>5.1}%  ({:.6} kg)",
            truncate(model, 32),
            share_bar(share, 24),
            share * 100.0,
            co2
        );
    }
}

/// Print the known models and their energy coefficients
pub fn print_models(table: &EnergyFactorTable, default_model: &str) {
    println!("{}", "Known Models (kWh per 1000 tokens)".bright_cyan().bold());
    for model in table.known_models() {
        let marker = if model == default_model { " (default)" } else { "" };
        println!(
            "  {:<36} {:.6}{}",
            model,
            table.factor_for(model),
            marker.bright_green()
        );
    }
    println!("  {:<36} {:.6}", "<any other model>", table.default_factor);
}

/// Fixed-width share bar, full blocks for the filled part
pub fn share_bar(share: f64, width: usize) -> String {
    let filled = ((share.clamp(0.0, 1.0)) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn truncate(s: &str, max_chars: usize) -> String {
    let cleaned: String = s.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let head: String = cleaned.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_bar_is_fixed_width() {
        assert_eq!(share_bar(0.0, 10).chars().count(), 10);
        assert_eq!(share_bar(0.5, 10).chars().count(), 10);
        assert_eq!(share_bar(1.0, 10).chars().count(), 10);
        assert_eq!(share_bar(2.5, 10).chars().count(), 10);
    }

    #[test]
    fn truncate_flattens_newlines_and_caps_length() {
        assert_eq!(truncate("one\ntwo", 10), "one two");
        assert_eq!(truncate("abcdefghij", 5).chars().count(), 5);
    }
}
