use crate::models::api::Completion;
use crate::models::{Footprint, QueryRecord};
use chrono::Utc;

/// Append-only, in-memory history of completed queries.
///
/// Created empty at session start and discarded at session end; records
/// are never updated, removed, or reordered. Not persisted across runs,
/// which is an accepted limitation rather than a bug.
#[derive(Debug, Default)]
pub struct HistorySession {
    records: Vec<QueryRecord>,
}

impl HistorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed call. The record id is the 1-based position in
    /// the session, so ids are strictly increasing by one.
    pub fn append(
        &mut self,
        model: &str,
        prompt: &str,
        completion: &Completion,
        footprint: Footprint,
    ) -> &QueryRecord {
        let record = QueryRecord {
            id: self.records.len() as u64 + 1,
            model: model.to_string(),
            prompt: prompt.to_string(),
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            total_tokens: completion.total_tokens,
            energy_kwh: footprint.energy_kwh,
            co2_kg: footprint.co2_kg,
            response: completion.text.clone(),
            timestamp: Utc::now(),
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Full history in insertion order
    pub fn all(&self) -> &[QueryRecord] {
        &self.records
    }

    /// Most recently appended record, for headline display
    pub fn latest(&self) -> Option<&QueryRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
