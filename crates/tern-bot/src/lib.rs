//! Dispatch layer for the tern gateway.
//!
//! Wires the event-gating core around a chat platform and a response
//! backend, both abstracted as traits: admission first, then command
//! routing, rate limiting, and single-flight handler execution, plus the
//! background cleanup and health loops. Embedders provide a `ChatClient`,
//! a `Responder`, a config, and a stream of `InboundEvent`s.

pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
mod handlers;
pub mod tasks;
pub mod telemetry;

pub use client::{ChatClient, Responder};
pub use commands::BotCommand;
pub use config::BotConfig;
pub use context::BotContext;
pub use dispatch::{InboundEvent, dispatch_event, run_dispatch};
pub use tasks::spawn_background_tasks;
pub use telemetry::init_tracing;
