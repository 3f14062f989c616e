// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! `ci-arbiterd`: the operator binary. Each subcommand drives one
//! long-running component of the pipeline (§2); `run-all` spawns every
//! component as tasks sharing one in-process bus and store, for local
//! development and smoke-testing (there is no durable `MessageBus`
//! implementation in this workspace yet, so standalone subcommands cannot
//! presently talk to each other across process boundaries — see
//! `ci_cli::runtime::build_bus`).

mod error;
mod runtime;

use ci_analyzer::{
    AnalyzerWorker, DiffAnalyzer, IntentAnalyzer, PerformanceAnalyzer, SecurityAnalyzer, TestAnalyzer, WorkerConfig,
};
use ci_arbiter::{AgentWeights, ArbiterConfig, ArbiterService};
use ci_config::Config;
use ci_core::metrics::Registry;
use ci_orchestrator::{OrchestratorConfig, OrchestratorService};
use clap::{Parser, Subcommand};
use error::CliError;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "ci-arbiterd", version, about = "Release-verdict pipeline: gateway, orchestrator, arbiter, and analyzer workers in one binary")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP intake and query surface (§4.3).
    Gateway,
    /// Run the two `agent_results`/`release_decisions` mirroring loops (§4.6).
    Orchestrator,
    /// Run the fan-in aggregator (§4.5).
    Arbiter,
    /// Run one analyzer worker (§4.4). `name` is one of diff, intent, security, performance, test.
    Agent { name: String },
    /// Run every component as tasks sharing one in-process bus and store.
    RunAll,
}

#[tokio::main]
async fn main() -> ExitCode {
    runtime::init_tracing();

    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "configuration error at startup");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Gateway => run_gateway(config).await,
        Command::Orchestrator => run_orchestrator(config).await,
        Command::Arbiter => run_arbiter(config).await,
        Command::Agent { name } => run_agent(config, &name).await,
        Command::RunAll => run_all(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run_gateway(config: Config) -> Result<(), CliError> {
    let store = runtime::build_store(&config.database_url)?;
    let bus = runtime::build_bus();
    let state = ci_gateway::AppState { store, bus, config: Arc::new(config.clone()), metrics: Registry::new() };

    let listener = tokio::net::TcpListener::bind(config.gateway_bind_addr()).await?;
    info!(addr = %config.gateway_bind_addr(), "gateway listening");
    axum::serve(listener, ci_gateway::router(state)).await?;
    Ok(())
}

async fn run_orchestrator(config: Config) -> Result<(), CliError> {
    let store = runtime::build_store(&config.database_url)?;
    let bus = runtime::build_bus();
    let service = Arc::new(OrchestratorService::new(bus, store, OrchestratorConfig::default()));
    info!("orchestrator running");
    service.run().await;
}

async fn run_arbiter(config: Config) -> Result<(), CliError> {
    let bus = runtime::build_bus();
    let service = ArbiterService::new(
        bus,
        AgentWeights::default(),
        ArbiterConfig { wait_timeout: config.arbiter_wait_timeout(), ..ArbiterConfig::default() },
    );
    info!(wait_timeout_secs = config.arbiter_wait_timeout_seconds, "arbiter running");
    service.run().await;
}

async fn run_agent(config: Config, name: &str) -> Result<(), CliError> {
    let bus = runtime::build_bus();
    let worker_config = WorkerConfig { analyze_deadline: config.agent_timeout(), max_retries: config.max_retries, ..WorkerConfig::default() };
    info!(agent = name, "analyzer worker running");
    spawn_worker(bus, name, worker_config).await?.await.map_err(CliError::JoinFailed)
}

/// Spawn the single named analyzer worker as a background task, returning
/// its join handle so callers (here, and `run_all` below) can await it.
async fn spawn_worker(
    bus: Arc<dyn ci_bus::MessageBus>,
    name: &str,
    config: WorkerConfig,
) -> Result<tokio::task::JoinHandle<()>, CliError> {
    macro_rules! spawn {
        ($analyzer:expr) => {{
            let mut worker = AnalyzerWorker::new(Arc::new($analyzer), bus, config);
            tokio::spawn(async move {
                worker.run().await;
            })
        }};
    }

    let handle = match name {
        "diff" => spawn!(DiffAnalyzer),
        "intent" => spawn!(IntentAnalyzer::default()),
        "security" => spawn!(SecurityAnalyzer),
        "performance" => spawn!(PerformanceAnalyzer),
        "test" => spawn!(TestAnalyzer),
        other => return Err(CliError::UnknownAgent(other.to_string())),
    };
    Ok(handle)
}

/// Spawn every component in-process, sharing one bus and store, and wait
/// forever. This is the only subcommand where the five analyzer workers,
/// the orchestrator, the arbiter, and the gateway can actually exchange
/// events, since `MemoryBus` doesn't cross a process boundary (§1).
async fn run_all(config: Config) -> Result<(), CliError> {
    let store = runtime::build_store(&config.database_url)?;
    let bus = runtime::build_bus();

    let worker_config =
        WorkerConfig { analyze_deadline: config.agent_timeout(), max_retries: config.max_retries, ..WorkerConfig::default() };
    let mut workers = Vec::new();
    for name in ["diff", "intent", "security", "performance", "test"] {
        workers.push(spawn_worker(bus.clone(), name, worker_config.clone()).await?);
    }

    let orchestrator = Arc::new(OrchestratorService::new(bus.clone(), store.clone(), OrchestratorConfig::default()));
    let orchestrator_task = tokio::spawn(async move {
        orchestrator.run().await;
    });

    let arbiter = ArbiterService::new(
        bus.clone(),
        AgentWeights::default(),
        ArbiterConfig { wait_timeout: config.arbiter_wait_timeout(), ..ArbiterConfig::default() },
    );
    let arbiter_task = tokio::spawn(async move {
        arbiter.run().await;
    });

    let state = ci_gateway::AppState { store, bus, config: Arc::new(config.clone()), metrics: Registry::new() };
    let listener = tokio::net::TcpListener::bind(config.gateway_bind_addr()).await?;
    info!(addr = %config.gateway_bind_addr(), "gateway listening (run-all)");
    let gateway_task = tokio::spawn(async move {
        let _ = axum::serve(listener, ci_gateway::router(state)).await;
    });

    // Every task above loops forever; if any of them panics, surface it
    // rather than silently degrading to a partial pipeline.
    tokio::select! {
        result = orchestrator_task => result.map_err(CliError::JoinFailed)?,
        result = arbiter_task => result.map_err(CliError::JoinFailed)?,
        result = gateway_task => result.map_err(CliError::JoinFailed)?,
        result = futures_join_all(workers) => result?,
    }
    Ok(())
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) -> Result<(), CliError> {
    for handle in handles {
        handle.await.map_err(CliError::JoinFailed)?;
    }
    // Workers loop forever in `run()`; reaching here means every worker
    // task exited, which only happens on panic (already propagated above)
    // -- unreachable in practice, kept so the select! arm type-checks.
    std::future::pending::<()>().await;
    Ok(())
}
