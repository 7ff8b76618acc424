//! text2sql - natural-language questions answered with read-only SQL.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use text2sql::cli::{Cli, Command};
use text2sql::config::Config;
use text2sql::db::{self, DataStore};
use text2sql::error::Text2SqlError;
use text2sql::llm::{create_client, LlmClient};
use text2sql::logging;
use text2sql::query::{Pipeline, QueryRequest};
use text2sql::safety::SafetyGate;
use text2sql::server::{self, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    let log_file = cli.log_file;
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<Text2SqlError>() {
            Some(err) => error!("{}: {:#}", err.category(), e),
            None => error!("{:#}", e),
        }
        if log_file {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    // Precedence: CLI flags, environment, config file, defaults.
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env();
    cli.apply_overrides(&mut config);
    config.validate()?;

    let store: Arc<dyn DataStore> = Arc::from(
        db::connect(&config.database)
            .await
            .with_context(|| format!("Cannot open {}", config.database.path.display()))?,
    );

    let result = match cli.command.clone() {
        Command::Serve { .. } => serve(&config, store.clone()).await,
        Command::Ask {
            question,
            assumptions,
            limit,
        } => {
            let request = QueryRequest {
                question,
                assumptions,
                limit,
            };
            ask(&config, store.clone(), request).await
        }
        Command::Query { sql } => query(&config, store.as_ref(), &sql).await,
    };

    store.close().await?;
    result
}

fn build_pipeline(config: &Config, store: Arc<dyn DataStore>) -> anyhow::Result<Pipeline> {
    let llm: Arc<dyn LlmClient> = Arc::from(create_client(&config.llm, None)?);
    info!("Using LLM provider: {}", config.llm.provider);
    Ok(Pipeline::from_config(config, llm, store)?)
}

/// Returns a token cancelled on Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });
    token
}

async fn serve(config: &Config, store: Arc<dyn DataStore>) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, store)?;
    let state = AppState::new(pipeline);
    server::serve(&config.server, state, ctrl_c_token()).await?;
    Ok(())
}

async fn ask(config: &Config, store: Arc<dyn DataStore>, request: QueryRequest) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, store)?;
    let response = pipeline.answer(&request, &ctrl_c_token()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn query(config: &Config, store: &dyn DataStore, sql: &str) -> anyhow::Result<()> {
    let gate = SafetyGate::with_strict(config.pipeline.strict_safety);
    let results = gate.execute(store, sql, None).await?;
    println!("{}", serde_json::to_string_pretty(&results.rows)?);
    Ok(())
}
