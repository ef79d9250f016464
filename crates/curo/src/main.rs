// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Curo - clinic notification and nurturing automation engine.
//!
//! Binary entry point: serves the HTTP gateway or executes one-off
//! automation runs from the command line.

mod rules;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use curo_config::CuroConfig;
use curo_core::types::OpenSlot;
use curo_core::{CuroError, RuleFamily};
use curo_engine::RunParams;
use tokio_util::sync::CancellationToken;

/// Curo - clinic notification and nurturing automation engine.
#[derive(Parser, Debug)]
#[command(name = "curo", version, about, long_about = None)]
struct Cli {
    /// Path to the rules and sequences file.
    #[arg(long, default_value = "rules.toml", global = true)]
    rules: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP gateway for an external scheduler.
    Serve,
    /// Execute one automation run and print its report.
    Run {
        /// Rule family (e.g. appointment_reminder, birthday, no_show).
        family: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print the side-effect-free pending candidate count for a family.
    Pending {
        /// Rule family (e.g. appointment_reminder, birthday, no_show).
        family: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print the resolved configuration summary.
    Config,
}

/// Run parameters shared by `run` and `pending`.
#[derive(Args, Debug)]
struct ParamArgs {
    /// Reminder horizon in hours (appointment_reminder).
    #[arg(long)]
    hours_ahead: Option<i64>,

    /// How long ago the appointment should have started (no_show).
    #[arg(long)]
    hours_ago: Option<i64>,

    /// Inactivity threshold in days (reactivation).
    #[arg(long)]
    days_inactive: Option<i64>,

    /// Open slot date, YYYY-MM-DD (waitlist_match).
    #[arg(long)]
    slot_date: Option<NaiveDate>,

    /// Open slot time, HH:MM:SS (waitlist_match).
    #[arg(long)]
    slot_time: Option<NaiveTime>,

    /// Rank waitlist candidates without notifying them.
    #[arg(long)]
    rank_only: bool,
}

impl ParamArgs {
    fn into_params(self) -> RunParams {
        let slot = match (self.slot_date, self.slot_time) {
            (Some(date), Some(time)) => Some(OpenSlot {
                date,
                time,
                therapist_id: None,
            }),
            _ => None,
        };
        RunParams {
            hours_ahead: self.hours_ahead,
            hours_ago: self.hours_ago,
            days_inactive: self.days_inactive,
            slot,
            notify: self.rank_only.then_some(false),
        }
    }
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_family(raw: &str) -> Result<RuleFamily, CuroError> {
    raw.parse::<RuleFamily>().map_err(|_| {
        CuroError::InvalidParams(format!(
            "unknown rule family '{raw}' (expected one of: appointment_reminder, \
             birthday, no_show, reactivation, drip, waitlist_match)"
        ))
    })
}

fn print_config_summary(config: &CuroConfig) {
    println!("engine:");
    println!("  min_send_interval_ms = {}", config.engine.min_send_interval_ms);
    println!("  send_timeout_secs    = {}", config.engine.send_timeout_secs);
    println!("  retry_failed         = {}", config.engine.retry_failed);
    println!("storage:");
    println!("  database_path        = {}", config.storage.database_path);
    println!("  wal_mode             = {}", config.storage.wal_mode);
    println!("channels:");
    println!(
        "  chat  enabled={} configured={}",
        config.channels.chat.enabled,
        config.channels.chat.api_url.is_some() && config.channels.chat.api_token.is_some()
    );
    println!(
        "  email enabled={} configured={}",
        config.channels.email.enabled,
        config.channels.email.smtp_host.is_some()
    );
    println!(
        "  sms   enabled={} configured={}",
        config.channels.sms.enabled,
        config.channels.sms.api_url.is_some() && config.channels.sms.api_token.is_some()
    );
    println!("gateway:");
    println!("  bind                 = {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  bearer_token         = {}",
        if config.gateway.bearer_token.is_some() {
            "[set]"
        } else {
            "[unset -- /v1 routes reject all requests]"
        }
    );
}

async fn execute(cli: Cli, config: CuroConfig) -> Result<(), CuroError> {
    match cli.command {
        Commands::Serve => {
            let rules = rules::load_rules(&cli.rules)?;
            serve::run_serve(config, rules).await
        }
        Commands::Run { family, params } => {
            let family = parse_family(&family)?;
            let rules = rules::load_rules(&cli.rules)?;
            let runner =
                serve::build_runner(&config, rules, CancellationToken::new()).await?;
            let report = runner.run(family, params.into_params(), Utc::now()).await?;
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|e| CuroError::Internal(format!("report serialization: {e}")))?;
            println!("{rendered}");
            Ok(())
        }
        Commands::Pending { family, params } => {
            let family = parse_family(&family)?;
            let rules = rules::load_rules(&cli.rules)?;
            let runner =
                serve::build_runner(&config, rules, CancellationToken::new()).await?;
            let pending = runner
                .pending_count(family, params.into_params(), Utc::now())
                .await?;
            println!("{pending}");
            Ok(())
        }
        Commands::Config => {
            print_config_summary(&config);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match curo_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            curo_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.engine.log_level);

    if let Err(error) = execute(cli, config).await {
        eprintln!("curo: {error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_params() {
        let cli = Cli::parse_from([
            "curo",
            "run",
            "no_show",
            "--hours-ago",
            "2",
        ]);
        match cli.command {
            Commands::Run { family, params } => {
                assert_eq!(family, "no_show");
                assert_eq!(params.hours_ago, Some(2));
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn slot_requires_both_date_and_time() {
        let args = ParamArgs {
            hours_ahead: None,
            hours_ago: None,
            days_inactive: None,
            slot_date: Some(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()),
            slot_time: None,
            rank_only: false,
        };
        assert!(args.into_params().slot.is_none());
    }

    #[test]
    fn unknown_family_is_rejected_with_candidates() {
        let error = parse_family("birthdays").unwrap_err();
        assert!(error.to_string().contains("birthday"));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = curo_config::load_and_validate_str("").expect("default config is valid");
        assert_eq!(config.engine.min_send_interval_ms, 1500);
    }
}
