// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `curo serve` command implementation.
//!
//! Wires the SQLite stores, channel gateways, and the job runner, then
//! serves the HTTP gateway until interrupted.

use std::sync::Arc;

use curo_channels::GatewayRegistry;
use curo_config::CuroConfig;
use curo_core::CuroError;
use curo_engine::JobRunner;
use curo_gateway::ServerConfig;
use curo_storage::{Database, SqliteLedger, SqliteTargetStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::rules::RuleSet;

/// Build the job runner over the configured stores and gateways.
pub async fn build_runner(
    config: &CuroConfig,
    rules: RuleSet,
    cancel: CancellationToken,
) -> Result<Arc<JobRunner>, CuroError> {
    let db = Arc::new(
        Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?,
    );
    let store = Arc::new(SqliteTargetStore::new(db.clone()));
    let ledger = Arc::new(SqliteLedger::new(db, config.engine.retry_failed));
    let registry = GatewayRegistry::from_config(&config.channels)?;

    let runner = JobRunner::new(
        store,
        ledger,
        registry.all(),
        rules.rules,
        rules.sequences,
        config.engine.clone(),
    )
    .with_cancellation(cancel);
    Ok(Arc::new(runner))
}

/// Run the HTTP gateway until ctrl-c.
pub async fn run_serve(config: CuroConfig, rules: RuleSet) -> Result<(), CuroError> {
    let cancel = CancellationToken::new();
    let runner = build_runner(&config, rules, cancel.clone()).await?;

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    tokio::select! {
        result = curo_gateway::start_server(&server_config, runner) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, cancelling in-flight runs");
            cancel.cancel();
            Ok(())
        }
    }
}
