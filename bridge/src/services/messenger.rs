//! Cross-instance messaging over the host's plugin-message channels
//!
//! Relays every bridged event to all connected receivers on the event
//! channel, so other instances observe the same stream without
//! re-deriving it. The proxy channel is registered alongside for
//! inter-instance forwarding.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shared::ChannelEvent;

use crate::traits::{Host, Messenger};

/// Channel carrying bridged events between instances.
pub const CHANNEL_EVENTS: &str = "sidekick:events";
/// Reserved channel for inter-instance proxying.
pub const CHANNEL_PROXY: &str = "proxy";

pub struct RealMessenger<H: Host> {
    host: Arc<H>,
    registered: Mutex<Vec<String>>,
    delivered: AtomicU64,
    initialized: AtomicBool,
}

impl<H: Host> RealMessenger<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            registered: Mutex::new(Vec::new()),
            delivered: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    /// Register the event and proxy channels with the host.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        for channel in [CHANNEL_EVENTS, CHANNEL_PROXY] {
            if self.host.register_channel(channel) {
                self.registered.lock().push(channel.to_string());
            } else {
                warn!("Failed to register messaging channel {channel}");
            }
        }
    }

    /// Handle one payload received on a plugin-message channel.
    ///
    /// Only event payloads on the event channel are meaningful; anything
    /// else is ignored.
    pub fn handle_channel_message(&self, sender: &str, channel: &str, payload: &[u8]) {
        if !self.initialized.load(Ordering::Acquire) || channel != CHANNEL_EVENTS {
            return;
        }

        match serde_json::from_slice::<ChannelEvent>(payload) {
            Ok(event) if event.kind == "event" => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                debug!("Received event {} from {sender}", event.event);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to handle channel message from {sender}: {e}"),
        }
    }

    /// Total payloads delivered or accepted so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    /// Unregister every channel and report the delivery counter.
    pub fn cleanup(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        for channel in self.registered.lock().drain(..) {
            if !self.host.unregister_channel(&channel) {
                warn!("Failed to unregister messaging channel {channel}");
            }
        }
        let total = self.delivered.swap(0, Ordering::AcqRel);
        info!("Messaging channels closed. Payloads handled: {total}");
    }
}

impl<H: Host> Messenger for RealMessenger<H> {
    fn broadcast_event(&self, event: &str, args: &[String]) {
        if !self.initialized.load(Ordering::Acquire) {
            return;
        }

        let payload = ChannelEvent::new(event, args.to_vec());
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode channel event {event}: {e}");
                return;
            }
        };

        let mut sent = 0u64;
        for player in self.host.connected_players() {
            if self.host.send_channel_message(&player, CHANNEL_EVENTS, &bytes) {
                sent += 1;
            } else {
                warn!("Failed to deliver channel event to {player}");
            }
        }

        if sent > 0 {
            self.delivered.fetch_add(sent, Ordering::Relaxed);
            debug!("Broadcast event {event} to {sent} receiver(s)");
        }
    }
}
