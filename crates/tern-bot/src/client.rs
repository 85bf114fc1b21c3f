//! Trait seams for the external collaborators.
//!
//! The chat platform that carries messages and the model that generates
//! replies both live outside this crate; the dispatch layer only needs
//! the handful of calls below.

use std::future::Future;

use anyhow::Result;
use tern_core::{ChannelId, Turn};

/// Outbound side of the chat platform.
pub trait ChatClient: Send + Sync + 'static {
    /// Delivers a message to a channel.
    fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether the underlying connection is up. Feeds the readiness flag
    /// of the health document.
    fn is_connected(&self) -> bool;
}

/// The slow generation backend.
///
/// Called only while the actor's single-flight slot is held, and always
/// under a timeout: an unbounded hang here would lock the actor out of
/// every future operation.
pub trait Responder: Send + Sync + 'static {
    fn respond(
        &self,
        channel: ChannelId,
        speaker: &str,
        message: &str,
        context: &[Turn],
    ) -> impl Future<Output = Result<String>> + Send;
}
