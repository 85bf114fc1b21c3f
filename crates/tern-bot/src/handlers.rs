//! Handler bodies for commands and chat turns.
//!
//! Every body runs under the actor's single-flight slot via
//! `with_actor_lock`, so a handler cannot forget to release it. `Busy`
//! and rate-limit denials are control flow: the actor is told to wait
//! and nothing is counted as an error.

use std::time::Instant;

use anyhow::{Result, anyhow};
use chrono::Utc;
use tern_core::{ChannelId, LockOutcome, RateDecision, Turn};

use crate::client::{ChatClient, Responder};
use crate::commands::{self, BotCommand};
use crate::context::BotContext;
use crate::dispatch::InboundEvent;

pub(crate) async fn handle_chat<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    event: &InboundEvent,
) {
    let gateway = context.gateway();
    let window = context.config().chat_rate_limit();

    // Check and commit with no await in between: committing only after the
    // model call would let a second request through as Allowed.
    match gateway.rate_limiter().check(event.actor, Instant::now(), window) {
        RateDecision::Denied { retry_after } => {
            tracing::debug!(actor = %event.actor, ?retry_after, "rate limited");
            let notice = format!(
                "You're sending messages too quickly. Try again in {}s.",
                retry_after.as_secs().max(1)
            );
            send_notice(context, event.channel, &notice).await;
            return;
        }
        RateDecision::Allowed => gateway.rate_limiter().commit(event.actor, Instant::now()),
    }

    let outcome = gateway
        .with_actor_lock(event.actor, "chat", run_chat_turn(context, event))
        .await;

    match outcome {
        LockOutcome::Busy => {
            send_notice(
                context,
                event.channel,
                "Still working on your previous message. One moment.",
            )
            .await;
        }
        LockOutcome::Completed(Ok(reply)) => {
            if let Err(err) = context.client().send_message(event.channel, &reply).await {
                tracing::warn!(channel = %event.channel, "failed to deliver reply: {err:#}");
            }
        }
        LockOutcome::Completed(Err(err)) => {
            tracing::warn!(actor = %event.actor, "chat turn failed: {err:#}");
            gateway.stats().record_error(&format!("{err:#}"));
            send_notice(context, event.channel, "Sorry, something went wrong.").await;
        }
    }
}

async fn run_chat_turn<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    event: &InboundEvent,
) -> Result<String> {
    context.gateway().stats().record_command();

    let turns = context
        .gateway()
        .history()
        .recent(event.channel, context.config().max_turns_per_channel);

    let reply = tokio::time::timeout(
        context.config().respond_timeout(),
        context
            .responder()
            .respond(event.channel, &event.speaker, &event.text, &turns),
    )
    .await
    .map_err(|_elapsed| {
        anyhow!(
            "model response timed out after {}s",
            context.config().respond_timeout_secs
        )
    })??;

    // Recorded while the actor's slot is still held, so a follow-up turn
    // that acquires the slot next always sees this one in its context.
    context.gateway().history().append(
        event.channel,
        Turn {
            speaker: event.speaker.clone(),
            message: event.text.clone(),
            timestamp: Utc::now(),
            response: reply.clone(),
        },
    );

    Ok(reply)
}

pub(crate) async fn handle_command<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    event: &InboundEvent,
    command: BotCommand,
) {
    if commands::requires_privilege(command) && !event.privileged {
        tracing::debug!(actor = %event.actor, ?command, "unprivileged command attempt");
        send_notice(context, event.channel, "This command is restricted.").await;
        return;
    }

    let outcome = context
        .gateway()
        .with_actor_lock(
            event.actor,
            commands::op_name(command),
            async { run_command(context, event, command) },
        )
        .await;

    match outcome {
        LockOutcome::Busy => {
            send_notice(
                context,
                event.channel,
                "Still working on your previous message. One moment.",
            )
            .await;
        }
        LockOutcome::Completed(reply) => {
            if let Err(err) = context.client().send_message(event.channel, &reply).await {
                tracing::warn!(channel = %event.channel, "failed to deliver reply: {err:#}");
            }
        }
    }
}

fn run_command<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    event: &InboundEvent,
    command: BotCommand,
) -> String {
    context.gateway().stats().record_command();

    match command {
        BotCommand::Status => {
            let snapshot = context
                .gateway()
                .health_snapshot(context.client().is_connected(), Utc::now());
            format!(
                "Status: {} | up {}s | commands {} | messages {} | errors {}",
                snapshot.status,
                snapshot.uptime_seconds,
                snapshot.commands_executed,
                snapshot.messages_processed,
                snapshot.errors_count,
            )
        }
        BotCommand::ClearHistory => {
            if context.gateway().history().clear(event.channel) {
                "History cleared.".to_string()
            } else {
                "Nothing to clear for this channel.".to_string()
            }
        }
        BotCommand::ShowHistory => {
            let turns = context
                .gateway()
                .history()
                .recent(event.channel, context.config().max_turns_per_channel);
            if turns.is_empty() {
                return "No history for this channel yet.".to_string();
            }

            let mut lines = Vec::with_capacity(turns.len() * 2);
            for turn in &turns {
                lines.push(format!(
                    "{} {}: {}",
                    turn.timestamp.format("%H:%M"),
                    turn.speaker,
                    turn.message
                ));
                lines.push(format!("  bot: {}", turn.response));
            }
            lines.join("\n")
        }
    }
}

async fn send_notice<C: ChatClient, R: Responder>(
    context: &BotContext<C, R>,
    channel: ChannelId,
    text: &str,
) {
    if let Err(err) = context.client().send_message(channel, text).await {
        tracing::warn!(%channel, "failed to send notice: {err:#}");
    }
}
