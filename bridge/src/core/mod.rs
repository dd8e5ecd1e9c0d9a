//! Core building blocks composed by the bridge
//!
//! Leaf components only: none of these depend on the bridge itself.

pub mod envelope;
pub mod memory;
pub mod pool;
pub mod queue;

pub use envelope::EventEnvelope;
pub use memory::{MemoryConfig, MemoryOptimizer, PressureLevel};
pub use pool::ObjectPool;
pub use queue::OutboundQueue;
