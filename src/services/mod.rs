pub mod aggregator;
pub mod completion_client;
pub mod energy_model;
pub mod history;

use crate::models::api::Completion;
use crate::models::QueryRecord;
use completion_client::{CompletionClient, MockCompletionClient, QueryError};
use energy_model::EnergyModel;
use history::HistorySession;

/// Where completions come from: the real gateway or a simulator
pub enum CompletionBackend {
    Remote(CompletionClient),
    Mock(MockCompletionClient),
}

impl CompletionBackend {
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, QueryError> {
        match self {
            CompletionBackend::Remote(client) => client.complete(model, prompt).await,
            CompletionBackend::Mock(client) => client.complete(model, prompt).await,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, CompletionBackend::Mock(_))
    }
}

/// Ties the pipeline together: one prompt in, one recorded query out.
///
/// Owns the session history; the caller drives it sequentially, so at most
/// one request is ever in flight and no locking is needed.
pub struct QueryEngine {
    backend: CompletionBackend,
    energy_model: EnergyModel,
    session: HistorySession,
}

impl QueryEngine {
    pub fn new(backend: CompletionBackend, energy_model: EnergyModel) -> Self {
        Self {
            backend,
            energy_model,
            session: HistorySession::new(),
        }
    }

    /// Run one query end to end: call the API, estimate the footprint,
    /// and append to history.
    ///
    /// History grows only on a fully successful round trip with a positive
    /// token count; every error path leaves it untouched so aggregates are
    /// never polluted with degenerate rows.
    pub async fn run_query(&mut self, model: &str, prompt: &str) -> Result<&QueryRecord, QueryError> {
        let completion = self.backend.complete(model, prompt).await?;

        if completion.total_tokens == 0 {
            log::warn!("API returned a completion with zero tokens; not recording");
            return Err(QueryError::EmptyCompletion);
        }

        let footprint = self.energy_model.estimate(completion.total_tokens, model);
        log::info!(
            "Query {} via {model}: {} tokens, {:.6} kWh, {:.6} kg CO2",
            self.session.len() + 1,
            completion.total_tokens,
            footprint.energy_kwh,
            footprint.co2_kg
        );

        Ok(self.session.append(model, prompt, &completion, footprint))
    }

    pub fn session(&self) -> &HistorySession {
        &self.session
    }

    pub fn energy_model(&self) -> &EnergyModel {
        &self.energy_model
    }

    pub fn is_mock(&self) -> bool {
        self.backend.is_mock()
    }
}
