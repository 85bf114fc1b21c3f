//! Shared state handed to every handler.

use chrono::Utc;
use tern_core::Gateway;

use crate::client::{ChatClient, Responder};
use crate::config::BotConfig;

/// Everything a handler needs: the platform client, the response backend,
/// the gateway's shared stores, and the config. Built once at startup and
/// shared behind an `Arc`.
pub struct BotContext<C, R> {
    client: C,
    responder: R,
    gateway: Gateway,
    config: BotConfig,
}

impl<C: ChatClient, R: Responder> BotContext<C, R> {
    pub fn new(client: C, responder: R, config: BotConfig) -> Self {
        Self {
            client,
            responder,
            gateway: Gateway::new(config.gate_limits(), Utc::now()),
            config,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }
}
