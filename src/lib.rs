//! Camconsole Library
//!
//! Live tracking console core
//!
//! ## Architecture (7 Components)
//!
//! 1. IdentityRegistry - Stable person identities across appearances
//! 2. TrackStore - Per-camera tracked object state
//! 3. EventLog - Bounded activity feed with alert counter
//! 4. ChannelManager - Streaming connection lifecycle and frame routing
//! 5. GatewayClient - REST access to the API gateway
//! 6. OverlayProjector - Tracked objects to drawable boxes
//! 7. FeedCoordinator - Camera tiles and playback state
//!
//! ## Design Principles
//!
//! - Identification is one-way: an identified object never reverts
//! - Transport faults recover locally: reconnect with backoff, state kept
//! - Registry mutation flows only through the identification path

pub mod channel_manager;
pub mod error;
pub mod event_log;
pub mod feed_coordinator;
pub mod gateway_client;
pub mod identity_registry;
pub mod overlay_projector;
pub mod state;
pub mod track_store;

pub use error::{Error, Result};
pub use state::AppState;
