//! The synchronizer: turns diffs into bounded wire batches and handles
//! client-originated option messages.
//!
//! Outbound, a diff becomes `Set`/`Delete` messages chunked at
//! [`MAX_BATCH_MESSAGES`] per batch; batches for one diff, and across
//! diffs, reach each connection in production order. Inbound, a client's
//! `Set` is validated against the live option before anything is applied
//! or echoed; a `Delete` is applied unconditionally (any client may send
//! one — see the crate docs for the hardening note).

use std::collections::HashMap;

use lobbysync_protocol::{ConnectionId, OptionValue, WireMessage, MAX_BATCH_MESSAGES};
use tokio::sync::mpsc;

use crate::{DiffOp, OptionSet, OptionsError, Reconciler};

/// Channel sender delivering outbound batches to one connection.
///
/// Each element is one ordered batch of at most [`MAX_BATCH_MESSAGES`]
/// messages; the transport forwards it as a single reliable send.
pub type ConnectionSender = mpsc::UnboundedSender<Vec<WireMessage>>;

/// Per-room connection registry and outbound batcher.
pub struct Synchronizer {
    /// Outbound channels, one per connection. Entries are removed on an
    /// explicit disconnect notification, never collected implicitly.
    connections: HashMap<ConnectionId, ConnectionSender>,
    /// Wrapping sequence counter stamped on every outbound message.
    seq: u16,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            seq: 0,
        }
    }

    /// Registers (or replaces, on reconnect) a connection's outbound
    /// channel.
    pub fn connect(&mut self, conn: ConnectionId, sender: ConnectionSender) {
        self.connections.insert(conn, sender);
    }

    /// Removes a connection. Returns `false` if it was not registered.
    pub fn disconnect(&mut self, conn: ConnectionId) -> bool {
        self.connections.remove(&conn).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn next_seq(&mut self) -> u16 {
        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        seq
    }

    /// Broadcasts a diff to every connection as ordered, bounded batches.
    pub fn broadcast_diff(&mut self, ops: Vec<DiffOp>) {
        let messages: Vec<WireMessage> = ops
            .into_iter()
            .map(|op| match op {
                DiffOp::Set(option) => WireMessage::Set {
                    seq_id: self.next_seq(),
                    option,
                },
                DiffOp::Delete(key) => WireMessage::Delete {
                    seq_id: self.next_seq(),
                    key,
                },
            })
            .collect();
        self.send_batches(&messages, None);
    }

    /// Sends the entire live set to one newly-authorized connection.
    ///
    /// Everything goes out as `Set` messages in display order; the
    /// connection starts from an empty local view, so no deletes are
    /// needed.
    pub fn resync(&mut self, conn: ConnectionId, live: &OptionSet) {
        let messages: Vec<WireMessage> = live
            .iter_by_priority()
            .cloned()
            .map(|option| WireMessage::Set {
                seq_id: self.next_seq(),
                option,
            })
            .collect();

        let Some(sender) = self.connections.get(&conn) else {
            tracing::warn!(%conn, "resync requested for unregistered connection");
            return;
        };
        for chunk in messages.chunks(MAX_BATCH_MESSAGES) {
            let _ = sender.send(chunk.to_vec());
        }
        tracing::debug!(%conn, options = live.len(), "full option resync sent");
    }

    /// Handles a client's proposed option update.
    ///
    /// Unknown keys are dropped silently (the client is stale); invalid
    /// values are logged and dropped with no correction echoed — the
    /// client reconciles on its next full resync. An accepted value is
    /// applied, cached, and echoed to every connection except the sender.
    ///
    /// Returns `true` if the live set changed and a reconcile pass should
    /// follow.
    pub fn handle_set(
        &mut self,
        key: &str,
        proposed: OptionValue,
        sender: ConnectionId,
        reconciler: &mut Reconciler,
    ) -> bool {
        match reconciler.apply_update(key, proposed) {
            Ok(option) => {
                let message = WireMessage::Set {
                    seq_id: self.next_seq(),
                    option,
                };
                self.send_batches(std::slice::from_ref(&message), Some(sender));
                true
            }
            Err(OptionsError::UnknownOption(_)) => {
                tracing::debug!(%sender, key, "update for unknown option, dropping");
                false
            }
            Err(err) => {
                tracing::warn!(%sender, key, %err, "rejected option update");
                false
            }
        }
    }

    /// Handles a client's option deletion.
    ///
    /// Applied unconditionally and echoed to everyone except the sender,
    /// even if the key was already gone (the echo is harmless and keeps
    /// stale views converging).
    ///
    /// Returns `true` if the live set changed.
    pub fn handle_delete(
        &mut self,
        key: &str,
        sender: ConnectionId,
        reconciler: &mut Reconciler,
    ) -> bool {
        let removed = reconciler.apply_delete(key).is_some();
        let message = WireMessage::Delete {
            seq_id: self.next_seq(),
            key: key.to_owned(),
        };
        self.send_batches(std::slice::from_ref(&message), Some(sender));
        if removed {
            tracing::debug!(%sender, key, "option deleted by client");
        }
        removed
    }

    /// Chunks `messages` and sends every batch, in order, to all
    /// connections except `exclude`.
    ///
    /// A closed channel means the connection is gone; the send is dropped
    /// silently and the registry entry waits for the explicit disconnect.
    fn send_batches(&self, messages: &[WireMessage], exclude: Option<ConnectionId>) {
        if messages.is_empty() {
            return;
        }
        for chunk in messages.chunks(MAX_BATCH_MESSAGES) {
            for (conn, sender) in &self.connections {
                if Some(*conn) == exclude {
                    continue;
                }
                let _ = sender.send(chunk.to_vec());
            }
        }
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
