//! Host-side bridge to a companion process
//!
//! Forwards host events to a spawned companion over newline-delimited
//! JSON on its standard streams and relays the companion's commands
//! (broadcast/whisper/log) back into the host, with a soft-capped
//! outbound queue, a TTL- and pressure-aware staging pool, and a
//! two-phase shutdown that contains a hung child.

pub mod bridge;
pub mod core;
pub mod error;
pub mod events;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use bridge::{BridgeConfig, BridgeStats, ProcessBridge};
pub use core::{EventEnvelope, MemoryConfig, MemoryOptimizer, ObjectPool, OutboundQueue, PressureLevel};
pub use error::{BridgeError, BridgeResult};
pub use events::HostEvent;
pub use traits::{ExecutableBuilder, HeapProbe, HeapSample, Host, Messenger};
