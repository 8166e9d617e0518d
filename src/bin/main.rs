use debate_trading_orchestrator::{
    config::Settings,
    generation::{GeminiClient, GenerationPort, MockGenerator, ResilientGenerator},
    memory::{load_seed, InMemoryMemoryStore},
    models::Record,
    pipeline::{Pipeline, PipelinePorts},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let input_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: orchestrator <records.json>");
            eprintln!("The file must hold a JSON array of records with subject_id, market_report, news_report, social_report and fundamentals_report.");
            std::process::exit(2);
        }
    };

    info!(path = %input_path, "Debate Trading Orchestrator starting");

    let records: Vec<Record> = serde_json::from_str(&std::fs::read_to_string(&input_path)?)?;

    // Generation tiers
    let (quick, deep): (Arc<dyn GenerationPort>, Arc<dyn GenerationPort>) =
        match settings.gemini_api_key.clone() {
            Some(api_key) => {
                let policy = settings.retry_policy();
                let quick = GeminiClient::new(
                    api_key.clone(),
                    settings.quick_thinking_model.clone(),
                    settings.generation_timeout,
                )?;
                let deep = GeminiClient::new(
                    api_key,
                    settings.deep_thinking_model.clone(),
                    settings.generation_timeout,
                )?;
                info!(
                    quick = %settings.quick_thinking_model,
                    deep = %settings.deep_thinking_model,
                    "Using Gemini generation"
                );
                let quick: Arc<dyn GenerationPort> =
                    Arc::new(ResilientGenerator::new(Arc::new(quick), policy.clone()));
                let deep: Arc<dyn GenerationPort> =
                    Arc::new(ResilientGenerator::new(Arc::new(deep), policy));
                (quick, deep)
            }
            None => {
                warn!("GEMINI_API_KEY not set - using canned mock generation");
                let mock: Arc<dyn GenerationPort> = Arc::new(MockGenerator::new());
                (mock.clone(), mock)
            }
        };

    // Private memory for the research debaters
    let bull_memory = Arc::new(InMemoryMemoryStore::new("bull"));
    let bear_memory = Arc::new(InMemoryMemoryStore::new("bear"));

    if let Some(path) = &settings.memory_seed_path {
        let mut seed = load_seed(path)?;
        bull_memory
            .add_situations(seed.remove("bull").unwrap_or_default())
            .await;
        bear_memory
            .add_situations(seed.remove("bear").unwrap_or_default())
            .await;
        for store in [&bull_memory, &bear_memory] {
            if store.is_empty().await {
                warn!(store = store.name(), "Memory seed has no entries for this store");
            } else {
                info!(store = store.name(), entries = store.len().await, "Memory seeded");
            }
        }
    }

    let pipeline = Pipeline::standard(
        PipelinePorts {
            quick,
            deep,
            bull_memory,
            bear_memory,
        },
        &settings.pipeline_config(),
    )?;

    let outcomes = pipeline.run_batch(records).await;

    let complete = outcomes.iter().filter(|o| o.status.is_complete()).count();
    info!(records = outcomes.len(), complete, "Batch complete");

    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    Ok(())
}
