//! Real implementations of the collaborator traits

pub mod compiler;
pub mod console_host;
pub mod heap;
pub mod messenger;

pub use compiler::RealExecutableBuilder;
pub use console_host::ConsoleHost;
pub use heap::RealHeapProbe;
pub use messenger::{RealMessenger, CHANNEL_EVENTS, CHANNEL_PROXY};
