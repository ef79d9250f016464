// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel gateway trait: the opaque outbound send capability.

use async_trait::async_trait;

use crate::error::CuroError;
use crate::types::ChannelKind;

/// One outbound transport (chat gateway, SMTP relay, SMS provider).
///
/// The wire protocol behind `send` is out of scope for the engine; a
/// gateway only promises a boolean delivery verdict. `Ok(false)` means the
/// transport accepted the call but rejected the message; `Err` means the
/// call itself failed. The dispatcher folds both into a `failed` outcome.
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Which channel this gateway serves.
    fn channel(&self) -> ChannelKind;

    /// Whether the gateway is configured and ready to accept sends.
    ///
    /// When false, the job runner refuses the whole run before touching
    /// any target.
    fn is_available(&self) -> bool;

    /// Deliver `text` to `contact`. The contact is already normalized for
    /// the channel (digits-only for phone-based channels).
    async fn send(&self, contact: &str, text: &str) -> Result<bool, CuroError>;

    /// Deliver with an optional subject line. Only subject-bearing
    /// transports (email) override this; everyone else ignores the subject.
    async fn send_with_subject(
        &self,
        contact: &str,
        subject: Option<&str>,
        text: &str,
    ) -> Result<bool, CuroError> {
        let _ = subject;
        self.send(contact, text).await
    }
}
