//! Shared types for the companion bridge
//!
//! Contains only what genuinely crosses a boundary: the wire protocol
//! spoken with the companion process, the cross-instance channel payload,
//! shared errors, and the tracing bootstrap. Host-side types (envelopes,
//! queues, pools) live in the `bridge` crate.

pub mod errors;
pub mod logging;
pub mod messages;

pub use errors::*;

// Re-export the wire protocol types
pub use messages::{ChannelEvent, ChildCommand, EventMessage, OutboundMessage};
