// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Curo automation engine.
//!
//! Orchestrates one rule family end-to-end: eligibility resolution under
//! time windows and exclusion rules, template rendering, rate-limited
//! dispatch through channel gateways, idempotent ledger writes, drip
//! sequence advancement, and waitlist candidate ranking.

pub mod dispatcher;
pub mod drip;
pub mod eligibility;
pub mod flags;
pub mod runner;
pub mod waitlist;

pub use dispatcher::{Dispatcher, SendOutcome, normalize_contact};
pub use eligibility::{Candidate, EligibilityResolver};
pub use flags::FlagLedger;
pub use runner::{JobRunner, RunParams};
pub use waitlist::{ScoredEntry, rank, score};
