//! Console host adapter for the standalone binary
//!
//! Stands in for a real game server: deliveries land on the log, no
//! players are ever connected, and channel plumbing is accepted but goes
//! nowhere.

use tracing::{debug, info};

use crate::core::envelope::EventEnvelope;
use crate::traits::Host;

pub struct ConsoleHost;

impl ConsoleHost {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for ConsoleHost {
    fn broadcast(&self, message: &str) {
        info!("[broadcast] {message}");
    }

    fn whisper(&self, player: &str, message: &str) -> bool {
        debug!("[whisper → {player}] {message} (no players connected)");
        false
    }

    fn console(&self, message: &str) {
        info!("{message}");
    }

    fn publish_event(&self, envelope: &EventEnvelope) {
        debug!(
            "event {} ({} args) dispatched in {:?}",
            envelope.name(),
            envelope.arg_count(),
            envelope.processing_time()
        );
    }

    fn connected_players(&self) -> Vec<String> {
        Vec::new()
    }

    fn register_channel(&self, channel: &str) -> bool {
        debug!("registered channel {channel}");
        true
    }

    fn unregister_channel(&self, channel: &str) -> bool {
        debug!("unregistered channel {channel}");
        true
    }

    fn send_channel_message(&self, _player: &str, _channel: &str, _payload: &[u8]) -> bool {
        false
    }
}
