//! Room actor: an isolated Tokio task that owns one room's option state.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The actor owns the reconciler and the
//! synchronizer outright; commands are processed one at a time, so a
//! reconcile triggered by one message always finishes before the next
//! message is looked at.

use std::collections::HashMap;

use lobbysync_protocol::{ConnectionId, GameOption, OptionValue, RoomId, WireMessage};
use tokio::sync::{mpsc, oneshot};

use crate::{
    ConnectionSender, DiffOp, ModeProvider, OptionsError, Reconciler, RoleProvider, Synchronizer,
};

/// Command channel capacity for a room actor.
///
/// Bounded so a flooding transport blocks instead of growing the mailbox
/// without limit.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in most variants is a reply channel; the caller
/// sends a command and awaits the response on it.
pub(crate) enum RoomCommand {
    /// Register a connection and send it the full live set.
    Connect {
        conn: ConnectionId,
        sender: ConnectionSender,
        reply: oneshot::Sender<()>,
    },

    /// Remove a connection.
    Disconnect {
        conn: ConnectionId,
        reply: oneshot::Sender<bool>,
    },

    /// Deliver a raw wire payload received from a connection.
    Message { sender: ConnectionId, payload: Vec<u8> },

    /// Install a game mode and its roles, replacing the previous ones.
    SetMode {
        mode: Box<dyn ModeProvider>,
        roles: Vec<Box<dyn RoleProvider>>,
        reply: oneshot::Sender<bool>,
    },

    /// Apply an authoritative option update (no originating connection).
    SetOption {
        key: String,
        value: OptionValue,
        reply: oneshot::Sender<Result<(), OptionsError>>,
    },

    /// Snapshot the live set in display order.
    GetOptions {
        reply: oneshot::Sender<Vec<GameOption>>,
    },

    /// Snapshot the value cache for persistence.
    CacheSnapshot {
        reply: oneshot::Sender<HashMap<String, OptionValue>>,
    },

    /// Restore a persisted cache snapshot.
    RestoreCache {
        entries: HashMap<String, OptionValue>,
        reply: oneshot::Sender<()>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone, it is just an `mpsc::Sender` wrapper. Every method
/// maps a lost channel (actor gone) to [`OptionsError::Unavailable`].
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Registers a connection's outbound channel and waits until the full
    /// option resync has been queued on it.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(), OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Connect {
                conn,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Removes a connection. Returns `false` if it was not registered.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<bool, OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Disconnect {
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Delivers a raw wire payload from a connection (fire-and-forget).
    pub async fn deliver(
        &self,
        sender: ConnectionId,
        payload: Vec<u8>,
    ) -> Result<(), OptionsError> {
        self.sender
            .send(RoomCommand::Message { sender, payload })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Installs a mode and its roles, replacing whatever ran before, and
    /// reconciles the live set against them.
    ///
    /// Returns whether reconciliation converged; `false` means the pass
    /// cap was hit and the room is running on a partial option set.
    pub async fn set_mode(
        &self,
        mode: Box<dyn ModeProvider>,
        roles: Vec<Box<dyn RoleProvider>>,
    ) -> Result<bool, OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::SetMode {
                mode,
                roles,
                reply: reply_tx,
            })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Applies an authoritative option update, broadcast to every
    /// connection.
    pub async fn set_option(
        &self,
        key: impl Into<String>,
        value: OptionValue,
    ) -> Result<(), OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::SetOption {
                key: key.into(),
                value,
                reply: reply_tx,
            })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?
    }

    /// Snapshots the live option set in display order.
    pub async fn options(&self) -> Result<Vec<GameOption>, OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::GetOptions { reply: reply_tx })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Snapshots the value cache for persistence across room restarts.
    pub async fn cache_snapshot(&self) -> Result<HashMap<String, OptionValue>, OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::CacheSnapshot { reply: reply_tx })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Restores a cache snapshot taken by
    /// [`cache_snapshot`](Self::cache_snapshot). Restored values apply on
    /// the next reconcile.
    pub async fn restore_cache(
        &self,
        entries: HashMap<String, OptionValue>,
    ) -> Result<(), OptionsError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::RestoreCache {
                entries,
                reply: reply_tx,
            })
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), OptionsError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| OptionsError::Unavailable(self.room_id))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    reconciler: Reconciler,
    sync: Synchronizer,
    mode: Option<Box<dyn ModeProvider>>,
    roles: Vec<Box<dyn RoleProvider>>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Connect {
                    conn,
                    sender,
                    reply,
                } => {
                    self.handle_connect(conn, sender);
                    let _ = reply.send(());
                }
                RoomCommand::Disconnect { conn, reply } => {
                    let removed = self.sync.disconnect(conn);
                    if removed {
                        tracing::info!(
                            room_id = %self.room_id,
                            %conn,
                            connections = self.sync.connection_count(),
                            "connection removed"
                        );
                    }
                    let _ = reply.send(removed);
                }
                RoomCommand::Message { sender, payload } => {
                    self.handle_message(sender, &payload);
                }
                RoomCommand::SetMode { mode, roles, reply } => {
                    let converged = self.handle_set_mode(mode, roles);
                    let _ = reply.send(converged);
                }
                RoomCommand::SetOption { key, value, reply } => {
                    let _ = reply.send(self.handle_set_option(&key, value));
                }
                RoomCommand::GetOptions { reply } => {
                    let options = self
                        .reconciler
                        .live()
                        .iter_by_priority()
                        .cloned()
                        .collect();
                    let _ = reply.send(options);
                }
                RoomCommand::CacheSnapshot { reply } => {
                    let _ = reply.send(self.reconciler.cache().snapshot());
                }
                RoomCommand::RestoreCache { entries, reply } => {
                    self.reconciler.cache_mut().restore(entries);
                    self.reconcile_and_broadcast();
                    let _ = reply.send(());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_connect(&mut self, conn: ConnectionId, sender: ConnectionSender) {
        self.sync.connect(conn, sender);
        self.sync.resync(conn, self.reconciler.live());
        tracing::info!(
            room_id = %self.room_id,
            %conn,
            connections = self.sync.connection_count(),
            "connection registered"
        );
    }

    fn handle_message(&mut self, sender: ConnectionId, payload: &[u8]) {
        let message = match WireMessage::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(
                    room_id = %self.room_id,
                    %sender,
                    %err,
                    "undecodable option message, dropping"
                );
                return;
            }
        };

        let changed = match message {
            WireMessage::Set { option, .. } => self.sync.handle_set(
                &option.key,
                option.value().clone(),
                sender,
                &mut self.reconciler,
            ),
            WireMessage::Delete { key, .. } => {
                self.sync.handle_delete(&key, sender, &mut self.reconciler)
            }
        };

        // Role providers may react to the new value.
        if changed {
            self.reconcile_and_broadcast();
        }
    }

    fn handle_set_mode(
        &mut self,
        mode: Box<dyn ModeProvider>,
        roles: Vec<Box<dyn RoleProvider>>,
    ) -> bool {
        tracing::info!(
            room_id = %self.room_id,
            mode = %mode.metadata().name,
            roles = roles.len(),
            "mode installed"
        );
        self.mode = Some(mode);
        self.roles = roles;
        self.reconcile_and_broadcast()
    }

    fn handle_set_option(&mut self, key: &str, value: OptionValue) -> Result<(), OptionsError> {
        let accepted = self.reconciler.apply_update(key, value)?;
        self.sync.broadcast_diff(vec![DiffOp::Set(accepted)]);
        self.reconcile_and_broadcast();
        Ok(())
    }

    /// Reconciles against the installed providers and broadcasts whatever
    /// changed. A no-op until a mode is installed.
    ///
    /// Returns whether reconciliation converged.
    fn reconcile_and_broadcast(&mut self) -> bool {
        let Some(mode) = self.mode.as_deref() else {
            return true;
        };
        let outcome = self.reconciler.run(mode, &self.roles);
        if !outcome.ops.is_empty() {
            tracing::debug!(
                room_id = %self.room_id,
                ops = outcome.ops.len(),
                passes = outcome.passes,
                "option set reconciled"
            );
            self.sync.broadcast_diff(outcome.ops);
        }
        outcome.converged
    }
}

/// Spawns a new room actor task and returns a handle to communicate
/// with it.
pub fn spawn_room(room_id: RoomId) -> RoomHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);

    let actor = RoomActor {
        room_id,
        reconciler: Reconciler::new(),
        sync: Synchronizer::new(),
        mode: None,
        roles: Vec::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
