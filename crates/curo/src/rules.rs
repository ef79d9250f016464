// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule and sequence definitions loaded from a TOML file.
//!
//! Rules and drip sequences are read-only input to the engine. Clinics
//! with an external rule store feed the engine directly; the standalone
//! deployment reads them from a `rules.toml` next to the config.

use std::path::Path;

use curo_core::CuroError;
use curo_core::types::{DripSequence, NotificationRule};
use serde::Deserialize;
use tracing::{info, warn};

/// The full rule configuration of one deployment.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    #[serde(rename = "rule")]
    pub rules: Vec<NotificationRule>,
    #[serde(rename = "sequence")]
    pub sequences: Vec<DripSequence>,
}

/// Load rules and sequences from `path`.
///
/// A missing file is not an error: the engine runs with an empty rule set
/// and every family returns "no active rule".
pub fn load_rules(path: &Path) -> Result<RuleSet, CuroError> {
    if !path.exists() {
        warn!(path = %path.display(), "no rules file found, starting with an empty rule set");
        return Ok(RuleSet::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| CuroError::Config(format!("failed to read {}: {e}", path.display())))?;
    let rules: RuleSet = toml::from_str(&raw)
        .map_err(|e| CuroError::Config(format!("invalid rules file {}: {e}", path.display())))?;

    info!(
        rules = rules.rules.len(),
        sequences = rules.sequences.len(),
        "rule set loaded"
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curo_core::{ChannelKind, RuleFamily, TriggerKind};

    #[test]
    fn parses_rules_and_sequences() {
        let raw = r#"
[[rule]]
id = "reminder-24h"
family = "appointment_reminder"
channel = "chat"
template = "Olá {{nome}}, consulta dia {{data}} às {{hora}}"
active = true

[[sequence]]
id = "lead-nurture"
name = "Nutrição de leads"
triggers = ["new_lead"]
active = true

[[sequence.steps]]
id = "lead-nurture-1"
order = 1
delay_days = 0
channel = "chat"
content = "Olá {{nome}}, bem-vindo!"

[[sequence.steps]]
id = "lead-nurture-2"
order = 2
delay_days = 3
channel = "email"
content = "Oi {{nome}}, ainda tem interesse?"
subject = "Ainda tem interesse?"
"#;
        let rules: RuleSet = toml::from_str(raw).unwrap();
        assert_eq!(rules.rules.len(), 1);
        assert_eq!(rules.rules[0].family, RuleFamily::AppointmentReminder);
        assert_eq!(rules.rules[0].channel, ChannelKind::Chat);

        let sequence = &rules.sequences[0];
        assert_eq!(sequence.triggers, vec![TriggerKind::NewLead]);
        assert_eq!(sequence.steps.len(), 2);
        assert_eq!(sequence.steps[1].channel, ChannelKind::Email);
        assert_eq!(sequence.steps[1].subject.as_deref(), Some("Ainda tem interesse?"));
    }

    #[test]
    fn missing_file_yields_empty_set() {
        let rules = load_rules(Path::new("/nonexistent/rules.toml")).unwrap();
        assert!(rules.rules.is_empty());
        assert!(rules.sequences.is_empty());
    }

    #[test]
    fn empty_document_is_valid() {
        let rules: RuleSet = toml::from_str("").unwrap();
        assert!(rules.rules.is_empty());
    }
}
