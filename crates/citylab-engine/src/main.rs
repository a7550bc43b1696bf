//! CityLab runner.
//!
//! Wires a scenario and a city into a [`SimulationEngine`], runs it to its
//! horizon, and prints the final [`RunReport`](citylab_core::RunReport) as
//! JSON on stdout.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments and load `citylab-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the scenario and city files
//! 4. Open the store (`PostgreSQL`, or memory with `--memory`)
//! 5. Build the reasoning provider, retriever, and prompt templates
//! 6. Initialize and run the engine; Ctrl-C cancels between ticks
//! 7. Print the report and clean up

mod inputs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use citylab_agents::{
    DocumentRetriever, KeywordRetriever, NoRetrieval, PromptEngine, ReasoningProvider,
};
use citylab_core::{CityLabConfig, Collaborators, LogFormat, SimulationEngine};
use citylab_db::{MemoryStore, PersistenceStore, PostgresConfig, PostgresStore};
use citylab_llm::{LlmConfig, LlmReasoning};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::inputs::Inputs;

/// Run one CityLab policy scenario.
#[derive(Parser, Debug)]
#[command(name = "citylab-engine")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario JSON: policy, agents, seed, horizon.
    #[arg(long)]
    scenario: PathBuf,

    /// City JSON: nodes, edges, transit routes, indicators.
    #[arg(long)]
    city: PathBuf,

    /// Engine configuration.
    #[arg(long, default_value = "citylab-config.yaml")]
    config: PathBuf,

    /// Override the scenario's horizon, in days.
    #[arg(long)]
    days: Option<u32>,

    /// Keep the timeline in memory instead of `PostgreSQL`.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = CityLabConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    init_tracing(&config);
    info!(config = %args.config.display(), "citylab-engine starting");

    let inputs = Inputs::load(&args.scenario, &args.city)?;
    let days = args.days.unwrap_or(inputs.scenario.simulation_days);
    info!(
        scenario = %inputs.scenario.name,
        seed = inputs.scenario.seed,
        agents = inputs.scenario.agents.len(),
        nodes = inputs.city.nodes.len(),
        days,
        "Inputs loaded"
    );

    let store = open_store(&config, args.memory).await?;
    let collaborators = collaborators(&config)?;

    let mut engine = SimulationEngine::new(&config, store, collaborators);
    let control = engine.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current tick");
            control.cancel();
        }
    });

    let outcome = run(&mut engine, &inputs, days).await;
    if let Err(err) = engine.cleanup().await {
        warn!(error = %err, "Cleanup failed");
    }
    let report = outcome?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        run_id = %report.run.id,
        status = report.run.status.as_str(),
        ticks = report.ticks_executed,
        "citylab-engine shutdown complete"
    );
    Ok(())
}

async fn run(
    engine: &mut SimulationEngine,
    inputs: &Inputs,
    days: u32,
) -> anyhow::Result<citylab_core::RunReport> {
    let run_id = engine.initialize(&inputs.scenario, &inputs.city).await?;
    let report = engine
        .run(days)
        .await
        .with_context(|| format!("run {run_id} did not complete"))?;
    Ok(report)
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &CityLabConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn open_store(
    config: &CityLabConfig,
    in_memory: bool,
) -> anyhow::Result<Arc<dyn PersistenceStore>> {
    if in_memory {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let pg_config = PostgresConfig::new(&config.infrastructure.postgres_url)
        .with_max_connections(config.infrastructure.max_connections);
    let store = PostgresStore::connect(&pg_config)
        .await
        .context("failed to connect to PostgreSQL")?;
    store.run_migrations().await?;
    Ok(Arc::new(store))
}

fn collaborators(config: &CityLabConfig) -> anyhow::Result<Collaborators> {
    let provider: Option<Arc<dyn ReasoningProvider>> =
        if config.reasoning.enabled && std::env::var_os("LLM_DEFAULT_BACKEND").is_some() {
            let llm = LlmConfig::from_env()?;
            info!(
                backend = ?llm.primary.backend_type,
                model = %llm.primary.model,
                escalation = llm.escalation.is_some(),
                "Reasoning provider configured"
            );
            Some(Arc::new(LlmReasoning::new(&llm)))
        } else {
            info!("No reasoning provider, agents use rule fallbacks");
            None
        };

    let retriever: Arc<dyn DocumentRetriever> = match &config.retrieval.documents_path {
        Some(path) => {
            let corpus = KeywordRetriever::from_path(Path::new(path))
                .with_context(|| format!("failed to load documents from {path}"))?;
            info!(documents = corpus.len(), "Document corpus loaded");
            Arc::new(corpus)
        }
        None => Arc::new(NoRetrieval),
    };

    let prompts = PromptEngine::load(config.reasoning.templates_dir.as_deref().map(Path::new))?;

    Ok(Collaborators {
        provider,
        retriever,
        prompts: Arc::new(prompts),
    })
}
