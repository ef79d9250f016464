// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the automation API.
//!
//! Handles POST /v1/runs/{family}, GET /v1/runs/{family}/pending, and the
//! public GET /health.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use curo_core::types::{OpenSlot, TargetDetail};
use curo_core::{CuroError, RuleFamily};
use curo_engine::RunParams;
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;

/// Response body for POST /v1/runs/{family}.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    /// Whether the run completed without any failed sends.
    pub success: bool,
    pub processed: u32,
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
    pub details: Vec<TargetDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body for GET /v1/runs/{family}/pending.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub family: String,
    pub pending: u32,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters for the pending count, with the optional slot
/// flattened into its date and time parts.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PendingQuery {
    pub hours_ahead: Option<i64>,
    pub hours_ago: Option<i64>,
    pub days_inactive: Option<i64>,
    pub slot_date: Option<NaiveDate>,
    pub slot_time: Option<NaiveTime>,
}

impl PendingQuery {
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
            notify: None,
        }
    }
}

fn parse_family(raw: &str) -> Result<RuleFamily, Response> {
    raw.parse::<RuleFamily>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unknown rule family: {raw}"),
            }),
        )
            .into_response()
    })
}

fn error_response(error: CuroError) -> Response {
    let status = match &error {
        CuroError::InvalidParams(_) => StatusCode::BAD_REQUEST,
        CuroError::RuleNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(%error, "automation run failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/runs/{family}
///
/// Executes one automation run synchronously and returns its report.
/// The body carries the run parameters; `{}` is a valid body.
pub async fn post_run(
    State(state): State<GatewayState>,
    Path(family): Path<String>,
    Json(params): Json<RunParams>,
) -> Response {
    let family = match parse_family(&family) {
        Ok(family) => family,
        Err(response) => return response,
    };

    match state.runner.run(family, params, Utc::now()).await {
        Ok(report) => Json(RunResponse {
            success: report.failed == 0,
            processed: report.processed,
            sent: report.sent,
            failed: report.failed,
            skipped: report.skipped,
            details: report.details,
            message: report.message,
        })
        .into_response(),
        Err(error) => error_response(error),
    }
}

/// GET /v1/runs/{family}/pending
///
/// Informational candidate count. Never writes to the ledger or stores.
pub async fn get_pending(
    State(state): State<GatewayState>,
    Path(family): Path<String>,
    Query(query): Query<PendingQuery>,
) -> Response {
    let family = match parse_family(&family) {
        Ok(family) => family,
        Err(response) => return response,
    };

    match state
        .runner
        .pending_count(family, query.into_params(), Utc::now())
        .await
    {
        Ok(pending) => Json(PendingResponse {
            family: family.to_string(),
            pending,
        })
        .into_response(),
        Err(error) => error_response(error),
    }
}

/// GET /health (unauthenticated).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
