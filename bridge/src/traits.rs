//! Trait definitions with mockall annotations for testing
//!
//! These are the seams between the bridge and its collaborators: the host
//! application, the step that produces the companion executable, the
//! cross-instance transport, and heap sampling. All of them are injected
//! at construction, never reached through globals.

use std::path::PathBuf;

use crate::core::envelope::EventEnvelope;
use crate::error::BridgeResult;

/// Host application abstraction
///
/// The surface the bridge needs from the surrounding game server: message
/// delivery to connected players, console logging, the host event bus, and
/// the plugin-message channel plumbing used by the cross-instance
/// transport.
#[mockall::automock]
pub trait Host: Send + Sync {
    /// Deliver a rich-text message to every currently connected player.
    fn broadcast(&self, message: &str);

    /// Deliver a rich-text message to one named player.
    ///
    /// Returns false when the player is not currently connected; that is
    /// a no-op, not an error.
    fn whisper(&self, player: &str, message: &str) -> bool;

    /// Log a line on the host console.
    fn console(&self, message: &str);

    /// Publish an event envelope onto the host's own event bus.
    fn publish_event(&self, envelope: &EventEnvelope);

    /// Names of all currently connected players.
    fn connected_players(&self) -> Vec<String>;

    /// Register a plugin-message channel. Returns false when the host
    /// refuses the registration.
    fn register_channel(&self, channel: &str) -> bool;

    /// Unregister a previously registered plugin-message channel.
    fn unregister_channel(&self, channel: &str) -> bool;

    /// Send a raw payload to one player on a registered channel.
    /// Returns false when the player is gone or the channel is not open.
    fn send_channel_message(&self, player: &str, channel: &str, payload: &[u8]) -> bool;
}

/// Producer of the companion executable
///
/// `build` performs the whole acquire-or-compile step and hands back the
/// path of a runnable executable. Failures are setup failures: the bridge
/// logs them and simply does not start.
#[mockall::automock]
pub trait ExecutableBuilder: Send + Sync {
    /// Produce the companion executable, compiling sources if necessary.
    fn build(&self) -> BridgeResult<PathBuf>;

    /// Number of companion source files currently present.
    fn source_count(&self) -> usize;
}

/// Secondary cross-instance transport
///
/// Fans one event out to every connected receiver on the well-known event
/// channel. Implementations must never block the caller for long; event
/// producers run on latency-sensitive paths.
#[mockall::automock]
pub trait Messenger: Send + Sync {
    /// Broadcast one event to all connected receivers.
    fn broadcast_event(&self, event: &str, args: &[String]);
}

/// One heap-usage observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeapSample {
    pub used_bytes: u64,
    pub max_bytes: u64,
}

impl HeapSample {
    /// Used/max ratio in `[0, 1]`; zero when the maximum is unknown.
    pub fn ratio(&self) -> f64 {
        if self.max_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.max_bytes as f64
    }
}

/// Heap usage sampling abstraction
///
/// `None` means the platform cannot be sampled; pressure policy is then
/// skipped for that cycle.
#[mockall::automock]
pub trait HeapProbe: Send + Sync {
    fn sample(&self) -> Option<HeapSample>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_sample_ratio() {
        let sample = HeapSample {
            used_bytes: 900,
            max_bytes: 1000,
        };
        assert!((sample.ratio() - 0.9).abs() < f64::EPSILON);

        let unknown = HeapSample {
            used_bytes: 900,
            max_bytes: 0,
        };
        assert_eq!(unknown.ratio(), 0.0);
    }

    #[test]
    fn mock_traits_can_be_instantiated() {
        let _host = MockHost::new();
        let _builder = MockExecutableBuilder::new();
        let _messenger = MockMessenger::new();
        let _probe = MockHeapProbe::new();
    }
}
