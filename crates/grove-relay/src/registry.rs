//! Connection registry: who is connected and what color they were given.

use std::collections::HashMap;
use std::time::Instant;

use grove_protocol::{FlowerPayload, Rgb, SessionId};
use rand::Rng;

use crate::outbox::Outbox;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Disconnected,
}

/// A connected visitor.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub color: Rgb,
    pub connected_at: Instant,
    pub state: SessionState,
    /// Join order, used to replay flowers deterministically.
    pub seq: u64,
    /// The session's flower once it has announced one.
    pub flower: Option<FlowerPayload>,
    outbox: Outbox,
}

impl Session {
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }
}

/// All sessions known to the relay. Owned by the hub, never shared.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection under a freshly minted id. The session
    /// stays `Connecting`, and out of every fan-out, until
    /// [`activate`](Self::activate) gives it a color.
    pub fn admit<R: Rng + ?Sized>(&mut self, outbox: Outbox, rng: &mut R) -> SessionId {
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = format!("s-{}-{:08x}", seq, rng.gen::<u32>());
        let session = Session {
            id: id.clone(),
            color: Rgb::default(),
            connected_at: Instant::now(),
            state: SessionState::Connecting,
            seq,
            flower: None,
            outbox,
        };
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Give a connecting session its color and make it active. Returns
    /// `None` for unknown or already active sessions.
    pub fn activate(&mut self, id: &str, color: Rgb) -> Option<&Session> {
        let session = self.sessions.get_mut(id)?;
        if session.state != SessionState::Connecting {
            return None;
        }
        session.color = color;
        session.state = SessionState::Active;
        Some(session)
    }

    /// Remove a session, returning it in its terminal state.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let mut session = self.sessions.remove(id)?;
        session.state = SessionState::Disconnected;
        Some(session)
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Record a session's flower. Returns `false` if it already has one.
    pub fn set_flower(&mut self, id: &str, flower: FlowerPayload) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.flower.is_none() => {
                session.flower = Some(flower);
                true
            }
            _ => false,
        }
    }

    /// Active sessions in no particular order.
    pub fn active(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().filter(|s| s.is_active())
    }

    /// Flowers of active sessions other than `except`, in join order.
    pub fn flowers_except(&self, except: &str) -> Vec<FlowerPayload> {
        let mut owners: Vec<_> = self
            .active()
            .filter(|s| s.id != except)
            .filter_map(|s| s.flower.as_ref().map(|f| (s.seq, f.clone())))
            .collect();
        owners.sort_by_key(|(seq, _)| *seq);
        owners.into_iter().map(|(_, f)| f).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn flower_count(&self) -> usize {
        self.sessions.values().filter(|s| s.flower.is_some()).count()
    }
}
