//! The event loop: admission first, then the command/chat split.

use std::sync::Arc;
use std::time::Instant;

use tern_core::{ActorId, Admission, ChannelId, EventId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{ChatClient, Responder};
use crate::commands;
use crate::context::BotContext;
use crate::handlers;

/// One normalized inbound event from the chat platform.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub event_id: EventId,
    pub actor: ActorId,
    pub channel: ChannelId,
    pub speaker: String,
    pub text: String,
    /// Whether the transport authenticated the sender as privileged.
    pub privileged: bool,
}

/// Receives events until the channel closes or `shutdown` fires.
///
/// Each event is handled on its own task, so a slow model call never
/// blocks admission of the next event. Overlap per actor is resolved by
/// the single-flight slot inside the handlers, not by the loop.
pub async fn run_dispatch<C: ChatClient, R: Responder>(
    context: Arc<BotContext<C, R>>,
    mut events: mpsc::UnboundedReceiver<InboundEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                tracing::info!("dispatch loop shutting down");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                let context = Arc::clone(&context);
                tokio::spawn(async move {
                    dispatch_event(&context, &event).await;
                });
            }
        }
    }
}

/// Admission, then routing. Suppressed duplicates return without side
/// effects; accepted events count as processed messages.
pub async fn dispatch_event<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    event: &InboundEvent,
) {
    let decision = context.gateway().on_inbound_event(
        event.event_id,
        event.actor,
        event.channel,
        &event.text,
        Instant::now(),
    );
    if decision != Admission::Accept {
        return;
    }
    context.gateway().stats().record_message();

    let bot_name = context.config().bot_name.as_deref();
    if let Some(command) = commands::parse_command(&event.text, bot_name) {
        handlers::handle_command(context, event, command).await;
    } else {
        handlers::handle_chat(context, event).await;
    }
}
