//! The relay hub: single writer for the registry and every fan-out.
//!
//! Connections never touch the registry directly. They send [`HubCommand`]s
//! to one task that admits sessions, stamps identities onto forwarded
//! events and pushes serialized frames into each recipient's outbox. Since
//! registry changes and broadcasts come out of the same loop, every visitor
//! sees them in one consistent order: nothing attributed to a session is
//! forwarded after its `userDisconnected`.
//!
//! ```text
//!  conn A ──┐                         ┌──> outbox A ──> writer A
//!  conn B ──┼── mpsc<HubCommand> ──> Hub ──> outbox B ──> writer B
//!  conn C ──┘                         └──> outbox C ──> writer C
//! ```

use std::sync::Arc;

use grove_protocol::{Assignment, ClientEvent, Palette, ServerEvent, SessionId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::outbox::{Frame, Outbox};
use crate::registry::Registry;

/// Which sessions receive a relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Every active session, the sender included.
    All,
    /// Every active session except the sender.
    AllExceptSender,
}

/// Snapshot of hub state for the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStatus {
    pub sessions: usize,
    pub avatars: usize,
}

/// Commands accepted by the hub task.
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        outbox: Outbox,
        reply: oneshot::Sender<Assignment>,
    },
    Inbound {
        session: SessionId,
        event: ClientEvent,
    },
    Disconnect {
        session: SessionId,
    },
    Status {
        reply: oneshot::Sender<HubStatus>,
    },
}

/// Registry owner and broadcast relay.
pub struct Hub {
    registry: Registry,
    palette: Palette,
    rng: StdRng,
    replay_avatars: bool,
}

impl Hub {
    /// Create a hub drawing ids and colors from entropy.
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a hub with a fixed random source.
    pub fn with_rng(config: &RelayConfig, rng: StdRng) -> Self {
        Self {
            registry: Registry::new(),
            palette: Palette::default(),
            rng,
            replay_avatars: config.replay_avatars,
        }
    }

    /// Move the hub onto its own task and return a handle to it.
    pub fn spawn(self) -> HubHandle {
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(self.run(rx));
        HubHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        debug!("hub command channel closed, stopping");
    }

    /// Apply one command.
    pub fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { outbox, reply } => {
                let assignment = self.connect(outbox);
                if reply.send(assignment.clone()).is_err() {
                    // The connection went away before learning its id.
                    self.disconnect(&assignment.session_id);
                }
            }
            HubCommand::Inbound { session, event } => self.inbound(&session, event),
            HubCommand::Disconnect { session } => self.disconnect(&session),
            HubCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Admit a session and queue its assignment (plus existing flowers) to
    /// it alone.
    pub fn connect(&mut self, outbox: Outbox) -> Assignment {
        let id = self.registry.admit(outbox, &mut self.rng);
        let color = self.palette.assign(&mut self.rng);
        self.registry.activate(&id, color);
        let assignment = Assignment { session_id: id, color };
        info!(session = %assignment.session_id, color = ?assignment.color, "session connected");

        self.unicast(
            &assignment.session_id,
            &ServerEvent::AssignColor(assignment.clone()),
        );

        if self.replay_avatars {
            for flower in self.registry.flowers_except(&assignment.session_id) {
                self.unicast(&assignment.session_id, &ServerEvent::FlowerBroadcast(flower));
            }
        }

        assignment
    }

    /// Handle an event sent by `sender`, replacing whatever identity it
    /// claimed with the registered one.
    pub fn inbound(&mut self, sender: &str, event: ClientEvent) {
        let Some(session) = self.registry.get(sender).filter(|s| s.is_active()) else {
            debug!(session = sender, event = event.name(), "dropping event from unknown session");
            return;
        };
        let color = session.color;

        match event {
            ClientEvent::NewPixel(pixel) => {
                if !pixel.is_drawable() {
                    debug!(session = sender, size = pixel.size, "dropping pixel that cannot be drawn");
                    return;
                }
                let mark = pixel.stamp(sender, color);
                self.relay(&ServerEvent::PixelBroadcast(mark), sender, Fanout::AllExceptSender);
            }
            ClientEvent::NewFlower(mut flower) => {
                flower.id = sender.to_string();
                if !self.registry.set_flower(sender, flower.clone()) {
                    debug!(session = sender, "session already has a flower, ignoring");
                    return;
                }
                self.relay(&ServerEvent::FlowerBroadcast(flower), sender, Fanout::All);
            }
            ClientEvent::AudioActivity(mut telemetry) => {
                telemetry.id = sender.to_string();
                self.relay(
                    &ServerEvent::AudioActivityBroadcast(telemetry),
                    sender,
                    Fanout::AllExceptSender,
                );
            }
        }
    }

    /// Remove a session and tell everyone left.
    pub fn disconnect(&mut self, id: &str) {
        let Some(session) = self.registry.remove(id) else {
            return;
        };
        info!(
            session = %session.id,
            connected_for = ?session.connected_at.elapsed(),
            remaining = self.registry.len(),
            "session disconnected"
        );
        self.relay(
            &ServerEvent::UserDisconnected(session.id.clone()),
            &session.id,
            Fanout::All,
        );
    }

    /// Fan an event out to active sessions. Returns how many outboxes
    /// accepted it.
    pub fn relay(&self, event: &ServerEvent, sender: &str, mode: Fanout) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        let mut delivered = 0;
        for session in self.registry.active() {
            if mode == Fanout::AllExceptSender && session.id == sender {
                continue;
            }
            if session.outbox().push(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                warn!(session = %session.id, event = event.name(), "send failed, awaiting transport disconnect");
            }
        }
        debug!(event = event.name(), sender, delivered, "relayed");
        delivered
    }

    /// Send an event to one session.
    fn unicast(&self, id: &str, event: &ServerEvent) -> bool {
        let (Some(session), Some(frame)) = (self.registry.get(id), encode(event)) else {
            return false;
        };
        let pushed = session.outbox().push(frame);
        if !pushed {
            warn!(session = id, event = event.name(), "send failed, awaiting transport disconnect");
        }
        pushed
    }

    pub fn status(&self) -> HubStatus {
        HubStatus {
            sessions: self.registry.len(),
            avatars: self.registry.flower_count(),
        }
    }
}

fn encode(event: &ServerEvent) -> Option<Frame> {
    match event.to_json() {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "failed to serialize event");
            None
        }
    }
}

/// Cloneable handle used by connections to talk to the hub task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    /// Register a connection whose frames go to `outbox`.
    pub async fn connect(&self, outbox: Outbox) -> Result<Assignment> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Connect { outbox, reply }).await?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    /// Forward an inbound event from `session`.
    pub async fn inbound(&self, session: &str, event: ClientEvent) -> Result<()> {
        self.send(HubCommand::Inbound {
            session: session.to_string(),
            event,
        })
        .await
    }

    /// Report that `session`'s transport is gone.
    pub async fn disconnect(&self, session: &str) -> Result<()> {
        self.send(HubCommand::Disconnect {
            session: session.to_string(),
        })
        .await
    }

    pub async fn status(&self) -> Result<HubStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Status { reply }).await?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::HubClosed)
    }
}
