#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative room server.
//!
//! [`RoomService`] owns the room lifecycle on top of a [`RoomStore`] and is
//! exposed over JSON/HTTP by [`router`]. [`serve`] wires both together from a
//! [`ServerConfig`].
//!
//! [`RoomStore`]: maze_sabotage_store::RoomStore

mod clock;
mod config;
mod cooldown;
mod http;
mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use maze_sabotage_store::{InMemoryRoomStore, RoomStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::net::TcpListener;
use tracing::info;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ServerConfig, StoreConfig};
pub use cooldown::{CooldownLedger, InMemoryCooldownLedger};
pub use http::router;
pub use service::{PrecheckView, Presence, PresenceView, RoomService, RoomView, ServiceError};

/// Builds a service backed by the in-memory store described by `config`.
#[must_use]
pub fn build_service(config: &ServerConfig) -> RoomService {
    let store: Arc<dyn RoomStore> = match config.store.write_quota {
        Some(quota) => Arc::new(InMemoryRoomStore::with_write_quota(quota)),
        None => Arc::new(InMemoryRoomStore::new()),
    };
    let rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    RoomService::new(store, Arc::new(SystemClock), rng)
        .with_write_interval(config.state_write_interval_secs)
}

/// Binds the configured address and serves requests until the process exits.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = router(Arc::new(build_service(&config)));
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local = listener
        .local_addr()
        .context("failed to read bound address")?;
    info!(address = %local, "room server listening");
    axum::serve(listener, app)
        .await
        .context("room server terminated")
}
