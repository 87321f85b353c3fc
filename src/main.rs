use ai_energy_monitor::{
    models::{credentials::CredentialManager, UserConfig},
    services::{
        completion_client::{CompletionClient, MockCompletionClient, QueryError},
        energy_model::EnergyModel,
        aggregator,
        CompletionBackend, QueryEngine,
    },
    ui::{self, DashboardUI},
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ai-energy-monitor")]
#[command(about = "Track the energy and CO2 footprint of your LLM API usage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model identifier (must be listed in the energy-factor table)
    #[arg(short, long)]
    model: Option<String>,

    /// API key; falls back to OPENROUTER_API_KEY and the data-dir key file
    #[arg(long)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output (debug log to file)
    #[arg(short, long)]
    verbose: bool,

    /// Use simulated completions instead of the remote API (development only)
    #[arg(long)]
    mock: bool,

    /// Show about information including version and build details
    #[arg(long)]
    about: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive prompt session with running history and statistics
    Session,
    /// Send a single prompt and print its estimated footprint
    Ask {
        /// The prompt text
        prompt: Vec<String>,
    },
    /// List known models and their energy coefficients
    Models,
    /// Update the configuration file
    Config {
        /// Set the default model
        #[arg(long)]
        model: Option<String>,
        /// Set the chat-completion endpoint base URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Set the request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Set the grid CO2 intensity (kg CO2 per kWh)
        #[arg(long)]
        grid_intensity: Option<f64>,
        /// Set a per-model energy factor, as MODEL=KWH_PER_1K_TOKENS
        #[arg(long)]
        factor: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    if cli.about {
        show_about();
        return Ok(());
    }

    // Initialize logging
    if cli.verbose {
        // Log to file when verbose
        use std::fs::OpenOptions;
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open("debug.log")?;

        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init();
    } else {
        // Normal logging to stderr for info/warn/error
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Warn)
            .init();
    }

    // Setup data directory
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ai-energy-monitor");
    std::fs::create_dir_all(&data_dir)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join("config.json"));
    let config = UserConfig::load_or_create(&config_path)?;

    // Take the subcommand out so the remaining flags can still be borrowed
    match cli.command.take() {
        Some(Commands::Models) => {
            ui::print_models(&config.energy_factors, &config.default_model);
            Ok(())
        }
        Some(Commands::Config {
            model,
            endpoint,
            timeout,
            grid_intensity,
            factor,
        }) => configure(&config_path, config, model, endpoint, timeout, grid_intensity, factor),
        Some(Commands::Ask { prompt }) => {
            let prompt = prompt.join(" ");
            let mut engine = build_engine(&cli, &config, &data_dir)?;
            let model = select_model(&cli, &config)?;
            run_one_query(&mut engine, &model, &prompt).await;
            Ok(())
        }
        Some(Commands::Session) | None => {
            let mut engine = build_engine(&cli, &config, &data_dir)?;
            let model = select_model(&cli, &config)?;
            run_session(&mut engine, &model, &config).await
        }
    }
}

/// Resolve the model to query and reject identifiers missing from the
/// energy-factor table.
fn select_model(cli: &Cli, config: &UserConfig) -> Result<String> {
    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());

    if !config.energy_factors.is_known(&model) {
        eprintln!(
            "{} Unknown model '{}'. Known models:",
            "Error:".bright_red().bold(),
            model
        );
        for known in config.energy_factors.known_models() {
            eprintln!("  {known}");
        }
        anyhow::bail!("model '{model}' is not in the energy-factor table");
    }
    Ok(model)
}

/// Build the query engine, resolving credentials unless running mocked
fn build_engine(cli: &Cli, config: &UserConfig, data_dir: &std::path::Path) -> Result<QueryEngine> {
    let energy_model = EnergyModel::from_config(config);

    let backend = if cli.mock {
        println!("{}", "Running in mock mode - using simulated completions".bright_yellow());
        CompletionBackend::Mock(MockCompletionClient::new())
    } else {
        let api_key = CredentialManager::load_credentials(cli.api_key.as_deref(), data_dir)?;
        let client = CompletionClient::new(&config.endpoint_url, &api_key, config.timeout_seconds)
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
        CompletionBackend::Remote(client)
    };

    Ok(QueryEngine::new(backend, energy_model))
}

/// Run one query and print either the record or a classified warning.
/// Every failure leaves the engine usable for the next attempt.
async fn run_one_query(engine: &mut QueryEngine, model: &str, prompt: &str) {
    match engine.run_query(model, prompt).await {
        Ok(record) => ui::print_latest(record),
        Err(QueryError::MissingPrompt) => {
            println!("{}", "Please enter a prompt first.".bright_yellow());
        }
        Err(QueryError::MissingCredential) => {
            println!("{}", "No API key configured; see --help for credential options.".bright_yellow());
        }
        Err(QueryError::EmptyCompletion) => {
            println!(
                "{}",
                "The API returned zero tokens; nothing was recorded.".bright_yellow()
            );
        }
        Err(e @ QueryError::Network(_)) | Err(e @ QueryError::Parse { .. }) => {
            println!("{} {e}", "API call failed:".bright_red().bold());
        }
    }
}

/// Interactive session loop. Sequential by construction: each prompt
/// waits for the previous call to finish.
async fn run_session(engine: &mut QueryEngine, model: &str, config: &UserConfig) -> Result<()> {
    println!("{}", "AI Energy Monitor - interactive session".bright_cyan().bold());
    println!("Model: {}", model.bright_white());
    println!("Type a prompt, or /stats /history /models /dashboard /quit\n");

    let stdin = std::io::stdin();
    loop {
        print!("{} ", ">".bright_green());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/stats" => {
                let records = engine.session().all();
                let stats = aggregator::stats(records);
                ui::print_stats(&stats);
                ui::print_co2_share(&aggregator::co2_by_model(records), stats.total_co2_kg);
            }
            "/history" => ui::print_history_table(engine.session().all()),
            "/models" => ui::print_models(engine.energy_model().table(), &config.default_model),
            "/dashboard" => {
                let records: Vec<_> = engine.session().all().to_vec();
                match DashboardUI::new() {
                    Ok(mut dashboard) => {
                        let result = dashboard.run(&records).await;
                        let _ = dashboard.cleanup();
                        if let Err(e) = result {
                            log::debug!("Dashboard not available: {e}");
                            println!("{}", "Dashboard not available in this terminal.".bright_yellow());
                        }
                    }
                    Err(e) => {
                        log::debug!("Dashboard not available: {e}");
                        println!("{}", "Dashboard not available in this terminal.".bright_yellow());
                    }
                }
            }
            "/help" => {
                println!("Commands: /stats /history /models /dashboard /quit");
            }
            prompt => run_one_query(engine, model, prompt).await,
        }
    }

    // Session summary on the way out
    if !engine.session().is_empty() {
        println!();
        ui::print_stats(&aggregator::stats(engine.session().all()));
    }
    println!("{}", "Session ended. History is not persisted.".bright_yellow());
    Ok(())
}

/// Apply config subcommand updates and save
fn configure(
    config_path: &std::path::Path,
    mut config: UserConfig,
    model: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
    grid_intensity: Option<f64>,
    factors: Vec<String>,
) -> Result<()> {
    if let Some(model) = model {
        if !config.energy_factors.is_known(&model) {
            println!(
                "{} '{}' has no energy factor yet; set one with --factor '{}=0.0003'",
                "Note:".bright_yellow(),
                model,
                model
            );
        }
        config.default_model = model;
        println!("Set default model to: {}", config.default_model.bright_green());
    }

    if let Some(endpoint) = endpoint {
        config.endpoint_url = endpoint;
        println!("Set endpoint to: {}", config.endpoint_url.bright_green());
    }

    if let Some(timeout) = timeout {
        config.timeout_seconds = timeout;
        println!("Set timeout to: {timeout} seconds");
    }

    if let Some(intensity) = grid_intensity {
        if intensity >= 0.0 {
            config.grid_co2_intensity = intensity;
            println!("Set grid CO2 intensity to: {intensity} kg/kWh");
        } else {
            println!("{} Grid intensity must be non-negative", "Error:".bright_red());
        }
    }

    for spec in factors {
        let (model, value) = parse_factor_spec(&spec)?;
        config.energy_factors.factors.insert(model.clone(), value);
        println!("Set energy factor for {}: {value} kWh/1k tokens", model.bright_green());
    }

    config.save(config_path)?;
    Ok(())
}

/// Parse a MODEL=KWH_PER_1K_TOKENS argument
fn parse_factor_spec(spec: &str) -> Result<(String, f64)> {
    let (model, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid factor '{spec}'; expected MODEL=KWH_PER_1K_TOKENS"))?;
    let value: f64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid factor value in '{spec}'"))?;
    if value < 0.0 {
        anyhow::bail!("energy factor must be non-negative in '{spec}'");
    }
    Ok((model.to_string(), value))
}

/// Display about information including version and build details
fn show_about() {
    println!("{}", "AI Energy Monitor".bright_cyan().bold());
    println!();
    println!("{}", "Version Information:".bright_yellow().bold());
    println!("  Version: {}", env!("CARGO_PKG_VERSION").bright_green());
    println!("  Built: {}", env!("AI_ENERGY_MONITOR_BUILD_TIME", "unknown"));
    println!("  Description: Lightweight Rust client for tracking the energy");
    println!("               and CO2 footprint of LLM API usage");
    println!();
    println!("{}", "Built Using:".bright_yellow().bold());
    println!("  - Rust programming language");
    println!("  - Tokio async runtime");
    println!("  - Ratatui terminal UI framework");
    println!();
    println!("{}", "Usage:".bright_green().bold());
    println!("  ai-energy-monitor                 # interactive session");
    println!("  ai-energy-monitor ask \"...\"       # one-shot query");
    println!("  ai-energy-monitor models          # list known models");
    println!("  ai-energy-monitor --mock          # simulated completions");
}
