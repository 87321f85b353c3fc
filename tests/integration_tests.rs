use ai_energy_monitor::models::{EnergyFactorTable, UserConfig};
use ai_energy_monitor::services::aggregator;
use ai_energy_monitor::services::completion_client::{
    CompletionClient, MockCompletionClient, QueryError,
};
use ai_energy_monitor::services::energy_model::EnergyModel;
use ai_energy_monitor::services::{CompletionBackend, QueryEngine};
use std::collections::HashMap;
use tempfile::TempDir;

fn test_table() -> EnergyFactorTable {
    let mut factors = HashMap::new();
    factors.insert("modelA".to_string(), 0.0004);
    factors.insert("modelB".to_string(), 0.0002);
    EnergyFactorTable {
        factors,
        default_factor: 0.0003,
    }
}

fn mock_engine() -> QueryEngine {
    QueryEngine::new(
        CompletionBackend::Mock(MockCompletionClient::new()),
        EnergyModel::new(test_table(), 0.4),
    )
}

#[tokio::test]
async fn test_sequential_record_ids() {
    let mut engine = mock_engine();

    for expected_id in 1..=3u64 {
        let record = engine
            .run_query("modelA", "what is the capital of France?")
            .await
            .unwrap();
        assert_eq!(record.id, expected_id);
    }

    let ids: Vec<u64> = engine.session().all().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(engine.session().latest().unwrap().id, 3);
}

#[tokio::test]
async fn test_recorded_footprint_matches_energy_model() {
    let mut engine = mock_engine();
    let record = engine.run_query("modelA", "hello there").await.unwrap();

    let expected_energy = record.total_tokens as f64 / 1000.0 * 0.0004;
    assert!((record.energy_kwh - expected_energy).abs() < 1e-12);
    assert!((record.co2_kg - expected_energy * 0.4).abs() < 1e-12);
    assert_eq!(record.total_tokens, record.input_tokens + record.output_tokens);
    assert!(record.total_tokens > 0);
}

#[tokio::test]
async fn test_failed_call_leaves_history_unchanged() {
    let mut engine = QueryEngine::new(
        CompletionBackend::Mock(MockCompletionClient::new().with_failure()),
        EnergyModel::new(test_table(), 0.4),
    );

    let before = engine.session().len();
    let result = engine.run_query("modelA", "hello").await;
    assert!(matches!(result, Err(QueryError::Network(_))));
    assert_eq!(engine.session().len(), before);
}

#[tokio::test]
async fn test_zero_token_completion_is_not_recorded() {
    let mut engine = QueryEngine::new(
        CompletionBackend::Mock(MockCompletionClient::new().with_zero_tokens()),
        EnergyModel::new(test_table(), 0.4),
    );

    let result = engine.run_query("modelA", "hello").await;
    assert!(matches!(result, Err(QueryError::EmptyCompletion)));
    assert!(engine.session().is_empty());

    // The engine stays usable for the next attempt
    assert!(matches!(
        engine.run_query("modelA", "hello again").await,
        Err(QueryError::EmptyCompletion)
    ));
    assert!(engine.session().is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_a_network_error() {
    // Grab a local port and release it so the connection is refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = CompletionClient::new(&format!("http://127.0.0.1:{port}"), "sk-test", 5).unwrap();
    let mut engine = QueryEngine::new(
        CompletionBackend::Remote(client),
        EnergyModel::new(test_table(), 0.4),
    );

    let result = engine.run_query("modelA", "hello").await;
    assert!(matches!(result, Err(QueryError::Network(_))));
    assert!(engine.session().is_empty());
}

#[tokio::test]
async fn test_missing_credential_is_rejected_before_any_request() {
    let client = CompletionClient::new("http://127.0.0.1:1", "", 5).unwrap();
    assert!(matches!(
        client.complete("modelA", "hello").await,
        Err(QueryError::MissingCredential)
    ));
}

#[tokio::test]
async fn test_blank_prompt_is_rejected_before_any_request() {
    let client = CompletionClient::new("http://127.0.0.1:1", "sk-test", 5).unwrap();
    assert!(matches!(
        client.complete("modelA", "   ").await,
        Err(QueryError::MissingPrompt)
    ));
}

#[tokio::test]
async fn test_total_energy_is_additive_over_appends() {
    let mut engine = mock_engine();

    let mut running_total = 0.0;
    for i in 0..5 {
        let record = engine
            .run_query("modelA", &format!("prompt number {i}"))
            .await
            .unwrap();
        running_total += record.energy_kwh;

        let stats = aggregator::stats(engine.session().all());
        assert!((stats.total_energy_kwh - running_total).abs() < 1e-12);
        assert_eq!(stats.count, i + 1);
    }
}

#[tokio::test]
async fn test_per_model_grouping_sums_to_total() {
    let mut engine = mock_engine();
    engine.run_query("modelA", "first prompt").await.unwrap();
    engine.run_query("modelB", "second prompt").await.unwrap();

    let records = engine.session().all();
    let stats = aggregator::stats(records);
    let groups = aggregator::co2_by_model(records);

    assert_eq!(groups.len(), 2);
    let grouped_total: f64 = groups.iter().map(|(_, co2)| co2).sum();
    assert!((grouped_total - stats.total_co2_kg).abs() < 1e-12);
}

#[tokio::test]
async fn test_series_follow_insertion_order() {
    let mut engine = mock_engine();
    engine.run_query("modelA", "one").await.unwrap();
    engine.run_query("modelB", "two").await.unwrap();

    let records = engine.session().all();
    let tokens = aggregator::token_series(records);
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].0, 1);
    assert_eq!(tokens[1].0, 2);

    let correlation = aggregator::correlation_series(records);
    assert_eq!(correlation[0].2, "modelA");
    assert_eq!(correlation[1].2, "modelB");
}

#[test]
fn test_config_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");

    // First load creates the file with defaults
    let created = UserConfig::load_or_create(&config_path).unwrap();
    assert!(config_path.exists());
    assert_eq!(created.timeout_seconds, 30);
    assert!((created.grid_co2_intensity - 0.4).abs() < 1e-12);

    // Modify, save, and reload
    let mut modified = created.clone();
    modified.default_model = "modelB".to_string();
    modified
        .energy_factors
        .factors
        .insert("modelB".to_string(), 0.0002);
    modified.save(&config_path).unwrap();

    let reloaded = UserConfig::load_or_create(&config_path).unwrap();
    assert_eq!(reloaded.default_model, "modelB");
    assert!((reloaded.energy_factors.factor_for("modelB") - 0.0002).abs() < 1e-12);
}

#[test]
fn test_default_config_models_are_known() {
    let config = UserConfig::default();
    assert!(config.energy_factors.is_known(&config.default_model));
    assert!(!config.energy_factors.is_known("default"));
}
