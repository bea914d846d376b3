//! The session manager: indexes every issued session.
//!
//! Responsibilities:
//! - Issuing unguessable session identifiers and reconnect tokens when a
//!   room is created or joined
//! - Checking a presented reconnect token against its seat
//! - Tracking which connection generation currently speaks for a session
//! - Recording explicit leaves
//! - Reporting rooms whose seats have all been absent for too long
//! - Dropping every session of a room once the room is removed
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself. The room registry owns
//! it behind a short-held lock, so the plain `HashMap` here never sees
//! concurrent access.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rand::Rng;
use strikeball_protocol::{ConnectionStatus, ReconnectToken, RoomCode, SessionId};

use crate::{Attachment, PlayerSession, Presence, Role, SessionConfig, SessionError};

/// Indexes all player sessions, keyed by session identifier.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ attach() ──→ detach() ──→ attach() ──→ ... ──→ leave()
///                                                               │
///                        remove_room() ◀── all_left() / absent_rooms()
/// ```
pub struct SessionManager {
    sessions: HashMap<SessionId, PlayerSession>,

    /// Monotonic source for attach generations. Shared across sessions so
    /// that a generation is never handed out twice.
    next_generation: u64,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            next_generation: 1,
            config,
        }
    }

    /// Issues a new session for a seat in `room_code`.
    ///
    /// The session starts out [`Presence::Pending`]; the connection that
    /// asked for it is expected to [`attach`](Self::attach) right after.
    pub fn create(
        &mut self,
        room_code: RoomCode,
        role: Role,
        nickname: String,
    ) -> &PlayerSession {
        let session_id = loop {
            let candidate = SessionId::new(generate_token());
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::info!(
            %session_id,
            %room_code,
            ?role,
            "session created"
        );

        self.sessions
            .entry(session_id.clone())
            .or_insert(PlayerSession {
                session_id,
                reconnect_token: ReconnectToken::new(generate_token()),
                room_code,
                role,
                nickname,
                presence: Presence::Pending {
                    since: Instant::now(),
                },
            })
    }

    /// Checks that `token` is the credential issued with `session_id`.
    ///
    /// A missing session and a wrong token are reported alike, so the
    /// error never confirms that a seat exists.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::BadToken`].
    pub fn verify(
        &self,
        session_id: &SessionId,
        token: Option<&ReconnectToken>,
    ) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        match token {
            Some(token) if *token == session.reconnect_token => Ok(()),
            _ => {
                tracing::debug!(%session_id, "reconnect token rejected");
                Err(SessionError::BadToken(session_id.clone()))
            }
        }
    }

    /// Returns `true` while `generation` is the connection bound to the
    /// session.
    pub fn is_current(&self, session_id: &SessionId, generation: u64) -> bool {
        self.sessions.get(session_id).is_some_and(|s| {
            s.presence == Presence::Connected { generation }
        })
    }

    /// Binds a (new) connection to a session.
    ///
    /// The first attach of a session reports [`ConnectionStatus::Connected`];
    /// every later one, including after a leave, reports
    /// [`ConnectionStatus::Reconnected`]. Attaching while another
    /// connection is bound supersedes that connection.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the session does not exist.
    pub fn attach(&mut self, session_id: &SessionId) -> Result<Attachment, SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        let status = match session.presence {
            Presence::Pending { .. } => ConnectionStatus::Connected,
            _ => ConnectionStatus::Reconnected,
        };
        let generation = self.next_generation;
        self.next_generation += 1;
        session.presence = Presence::Connected { generation };

        tracing::debug!(%session_id, generation, ?status, "connection attached");
        Ok(Attachment { generation, status })
    }

    /// Marks a session as disconnected, if `generation` is still current.
    ///
    /// Returns `true` when the presence actually changed. A stale
    /// generation (the player already attached elsewhere) or a session
    /// that has left is ignored and returns `false`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the session does not exist.
    pub fn detach(
        &mut self,
        session_id: &SessionId,
        generation: u64,
    ) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        match session.presence {
            Presence::Connected { generation: current } if current == generation => {
                session.presence = Presence::Disconnected {
                    since: Instant::now(),
                };
                tracing::info!(%session_id, "player disconnected");
                Ok(true)
            }
            _ => {
                tracing::debug!(%session_id, generation, "stale detach ignored");
                Ok(false)
            }
        }
    }

    /// Marks a session as having left its room.
    ///
    /// Returns `true` if the session was connected at the time.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the session does not exist.
    pub fn leave(&mut self, session_id: &SessionId) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        let was_connected = session.presence.is_connected();
        session.presence = Presence::Left {
            since: Instant::now(),
        };
        tracing::info!(%session_id, room_code = %session.room_code, "player left room");
        Ok(was_connected)
    }

    /// Forgets a single session, e.g. one issued for a join that the room
    /// then refused.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<PlayerSession> {
        self.sessions.remove(session_id)
    }

    /// Looks up a session.
    pub fn get(&self, session_id: &SessionId) -> Option<&PlayerSession> {
        self.sessions.get(session_id)
    }

    /// All sessions seated in `room_code`, in no particular order.
    pub fn sessions_in_room(&self, room_code: &RoomCode) -> Vec<&PlayerSession> {
        self.sessions
            .values()
            .filter(|s| &s.room_code == room_code)
            .collect()
    }

    /// Returns `true` if the room has sessions and every one of them left.
    pub fn all_left(&self, room_code: &RoomCode) -> bool {
        let seats = self.sessions_in_room(room_code);
        !seats.is_empty() && seats.iter().all(|s| s.has_left())
    }

    /// Rooms in which no seat has had a connection for at least
    /// `absent_timeout`.
    pub fn absent_rooms(&self) -> Vec<RoomCode> {
        let mut present: HashSet<&RoomCode> = HashSet::new();
        let mut absent: HashSet<&RoomCode> = HashSet::new();

        for session in self.sessions.values() {
            let timed_out = session
                .presence
                .absent_since()
                .is_some_and(|since| since.elapsed() >= self.config.absent_timeout);
            if timed_out {
                absent.insert(&session.room_code);
            } else {
                present.insert(&session.room_code);
            }
        }

        absent
            .difference(&present)
            .map(|code| (*code).clone())
            .collect()
    }

    /// Drops every session seated in `room_code`, returning their ids.
    pub fn remove_room(&mut self, room_code: &RoomCode) -> Vec<SessionId> {
        let mut removed = Vec::new();
        self.sessions.retain(|id, session| {
            if &session.room_code == room_code {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            tracing::debug!(%room_code, count = removed.len(), "sessions removed");
        }
        removed
    }

    /// Returns the number of sessions (any presence).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used for both session ids and reconnect tokens; neither may be guessable.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
