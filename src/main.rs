//! PawBuddy - Main CLI Entry Point

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pawbuddy::assistant::Assistant;
use pawbuddy::catalog;
use pawbuddy::cli::{Args, Commands};
use pawbuddy::config::Config;
use pawbuddy::context::ContextResolver;
use pawbuddy::intent::extractor::IntentExtractor;
use pawbuddy::lexicon::Lexicon;
use pawbuddy::nlu::NluClient;
use pawbuddy::profile::{ProfileBridge, SqliteProfileStore};
use pawbuddy::repl::ChatSession;
use pawbuddy::search::embedding::EmbeddingClient;
use pawbuddy::search::qdrant::QdrantSearch;
use pawbuddy::search::HybridRetriever;
use pawbuddy::session::InMemorySessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_target(false)
        .init();

    let mut config = Config::load(args.config.clone()).context("failed to load configuration")?;

    // CLI flags override file configuration
    config.nlu.host = args.host.clone();
    config.nlu.port = args.port;
    if let Some(model) = &args.model {
        config.nlu.model = model.clone();
    }

    match &args.command {
        Commands::Chat => {
            let assistant = build_assistant(&config)?;
            let mut session = ChatSession::new(assistant, args.customer.clone());
            session.run().await
        }

        Commands::Search { query } => {
            let assistant = build_assistant(&config)?;
            let response = assistant
                .handle_turn("oneshot", args.customer.as_deref(), query)
                .await?;

            if response.degraded.retrieval {
                eprintln!("{}", "retrieval failed - search service unavailable".red());
            }
            for (i, product) in response.results.iter().enumerate() {
                println!(
                    "{}. {} ${:.2} | {} | score {:.3}",
                    i + 1,
                    product.snapshot.name,
                    product.snapshot.price,
                    product.snapshot.brand.as_deref().unwrap_or("-"),
                    product.score,
                );
            }
            println!("filters: {}", response.resolved_intent.summary());
            Ok(())
        }

        Commands::Index { file } => {
            let search = build_vector_search(&config)?;
            let products = catalog::load_catalog(file)
                .with_context(|| format!("failed to load catalog from {}", file.display()))?;

            println!("Indexing {} products into '{}'...", products.len(), config.vector.collection);
            let indexed = catalog::index_catalog(&search, &products, !args.quiet).await?;
            println!("{} {} products indexed", "done:".green().bold(), indexed);
            Ok(())
        }

        Commands::Doctor => run_doctor(&config).await,

        Commands::Config => {
            let rendered = toml::to_string_pretty(&config)?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

/// Assemble the full pipeline against live services
fn build_assistant(config: &Config) -> Result<Assistant> {
    let lexicon = Arc::new(Lexicon::new());

    let nlu = NluClient::with_config(
        &config.nlu_url(),
        &config.nlu.model,
        Duration::from_millis(config.nlu.timeout_ms),
    )?;
    let extractor = IntentExtractor::new(Arc::new(nlu), Arc::clone(&lexicon));

    let resolver = ContextResolver::new(config.reference.clone());
    let retriever = HybridRetriever::new(
        Arc::new(build_vector_search(config)?),
        config.search.clone(),
    );

    let profile_store = SqliteProfileStore::open(&config.profile_db_path())?;
    let profiles = Arc::new(ProfileBridge::new(
        Arc::new(profile_store),
        Arc::clone(&lexicon),
    ));

    Ok(Assistant::new(
        lexicon,
        extractor,
        resolver,
        retriever,
        Arc::new(InMemorySessionStore::new()),
        Some(profiles),
        config,
    ))
}

fn build_vector_search(config: &Config) -> Result<QdrantSearch> {
    let embedder = EmbeddingClient::with_config(
        &config.nlu_url(),
        &config.vector.embed_model,
        Duration::from_millis(config.vector.timeout_ms),
    )?;
    Ok(QdrantSearch::new(
        &config.vector.url,
        &config.vector.collection,
        embedder,
    )?)
}

/// Check that both external services answer
async fn run_doctor(config: &Config) -> Result<()> {
    use pawbuddy::nlu::TextUnderstanding;
    use pawbuddy::search::VectorSearch;

    println!("{}", "PawBuddy doctor".bold());

    let nlu = NluClient::with_config(
        &config.nlu_url(),
        &config.nlu.model,
        Duration::from_millis(config.nlu.timeout_ms),
    )?;
    report("text-understanding service", &config.nlu_url(), nlu.health_check().await);

    let embedder = EmbeddingClient::with_config(
        &config.nlu_url(),
        &config.vector.embed_model,
        Duration::from_millis(config.vector.timeout_ms),
    )?;
    report("embeddings endpoint", &config.nlu_url(), embedder.health_check().await);

    let search = build_vector_search(config)?;
    let vector_ok = search.health_check().await;
    report("vector similarity service", &config.vector.url, vector_ok);

    if vector_ok {
        match search.count().await {
            Ok(count) => println!("  collection '{}' holds {} products", config.vector.collection, count),
            Err(e) => println!("  {} {}", "collection check failed:".yellow(), e),
        }
    }

    Ok(())
}

fn report(name: &str, url: &str, healthy: bool) {
    let status = if healthy { "ok".green().bold() } else { "unreachable".red().bold() };
    println!("  {} [{}] {}", status, url, name);
}
