// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel gateway for deterministic testing.
//!
//! `MockGateway` implements `ChannelGateway` with captured outbound
//! messages, a toggleable availability flag, and per-contact failure
//! injection (rejection or transport error).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use curo_core::{ChannelGateway, ChannelKind, CuroError};
use tokio::sync::Mutex;

/// One captured outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub contact: String,
    pub subject: Option<String>,
    pub text: String,
}

/// A mock channel gateway for testing.
pub struct MockGateway {
    channel: ChannelKind,
    available: AtomicBool,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    reject_contacts: Mutex<HashSet<String>>,
    error_contacts: Mutex<HashSet<String>>,
}

impl MockGateway {
    /// Create an available mock gateway for `channel`.
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            available: AtomicBool::new(true),
            sent: Arc::new(Mutex::new(Vec::new())),
            reject_contacts: Mutex::new(HashSet::new()),
            error_contacts: Mutex::new(HashSet::new()),
        }
    }

    /// Toggle the availability flag.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `send` return `Ok(false)` for this contact.
    pub async fn reject_contact(&self, contact: &str) {
        self.reject_contacts.lock().await.insert(contact.to_string());
    }

    /// Make `send` return `Err` for this contact.
    pub async fn error_contact(&self, contact: &str) {
        self.error_contacts.lock().await.insert(contact.to_string());
    }

    /// All messages that were sent, in order.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl ChannelGateway for MockGateway {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send(&self, contact: &str, text: &str) -> Result<bool, CuroError> {
        self.send_with_subject(contact, None, text).await
    }

    async fn send_with_subject(
        &self,
        contact: &str,
        subject: Option<&str>,
        text: &str,
    ) -> Result<bool, CuroError> {
        if !self.is_available() {
            return Err(CuroError::ChannelUnavailable {
                channel: self.channel.to_string(),
            });
        }
        if self.error_contacts.lock().await.contains(contact) {
            return Err(CuroError::Channel {
                message: format!("injected transport error for {contact}"),
                source: None,
            });
        }
        if self.reject_contacts.lock().await.contains(contact) {
            return Ok(false);
        }
        self.sent.lock().await.push(SentMessage {
            contact: contact.to_string(),
            subject: subject.map(str::to_string),
            text: text.to_string(),
        });
        Ok(true)
    }
}
