//! Tracing setup for binaries embedding the bot.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes the global subscriber. `RUST_LOG` overrides the default
/// filter. Call once, before spawning the dispatch loop.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tern_bot=info,tern_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
