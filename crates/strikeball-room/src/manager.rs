//! Room registry: creates rooms, seats players and routes sessions to rooms.

use std::collections::HashMap;

use futures_util::future::join_all;
use parking_lot::Mutex;
use rand::Rng;
use strikeball_protocol::{
    CreateRoomRequest, JoinRoomRequest, ReconnectToken, RoomCode, RoomCreated, RoomJoined,
    SessionId,
};
use strikeball_session::{Attachment, Role, SessionError, SessionManager};

use crate::game::Game;
use crate::room::spawn_room;
use crate::rules::{RuleConfiguration, normalize_nickname};
use crate::{GameError, RegistryConfig, RoomError, RoomHandle, SessionSender};

/// The maps shared by every connection.
struct Index {
    /// Active rooms, keyed by room code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// Every issued session, with its room and presence.
    sessions: SessionManager,
}

impl Index {
    fn handle_for_session(&self, session_id: &SessionId) -> Result<RoomHandle, RoomError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;
        self.rooms
            .get(&session.room_code)
            .cloned()
            .ok_or_else(|| RoomError::Unavailable(session.room_code.clone()))
    }
}

/// Maps room codes to running room actors and session ids to seats.
///
/// Shared by reference across connection tasks. The index lock is only
/// held for map lookups and inserts, never across an await: every call
/// into a room actor runs on a cloned [`RoomHandle`] after the lock is
/// released, so traffic in one room never waits on another. Ordering
/// within a room is the actor's job, and two racing joins are settled by
/// the actor admitting exactly one.
pub struct RoomRegistry {
    index: Mutex<Index>,
    config: RegistryConfig,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            index: Mutex::new(Index {
                rooms: HashMap::new(),
                sessions: SessionManager::new(config.session_config()),
            }),
            config,
        }
    }

    /// Opens a room and seats its creator.
    ///
    /// Must be called from within a Tokio runtime: the room actor is
    /// spawned here.
    ///
    /// # Errors
    /// - [`GameError::InvalidNickname`] for a bad nickname
    /// - [`GameError::InvalidConfiguration`] for bad or missing rules
    pub fn create_room(&self, request: &CreateRoomRequest) -> Result<RoomCreated, RoomError> {
        let nickname = normalize_nickname(request.nickname.as_deref(), Role::Creator.default_nickname())?;
        let rules = RuleConfiguration::from_request(request)?;

        // Collision check and insert happen under one lock.
        let mut index = self.index.lock();
        let room_code = loop {
            let candidate = generate_room_code();
            if !index.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(%candidate, "room code collision, retrying");
        };

        let session = index
            .sessions
            .create(room_code.clone(), Role::Creator, nickname.clone());
        let session_id = session.session_id.clone();
        let reconnect_token = session.reconnect_token.clone();

        let game = Game::new(room_code.clone(), rules, session_id.clone(), nickname);
        let handle = spawn_room(game, self.config.channel_size);
        index.rooms.insert(room_code.clone(), handle);

        tracing::info!(%room_code, %session_id, digits = rules.digits(), "room created");
        Ok(RoomCreated {
            room_code,
            session_id,
            reconnect_token,
            settings: rules.settings(),
        })
    }

    /// Seats a second player in an existing room.
    ///
    /// # Errors
    /// - [`GameError::InvalidNickname`] for a bad nickname
    /// - [`GameError::RoomNotFound`] for an unknown code
    /// - [`GameError::RoomFull`] / [`GameError::RoomClosed`] when the room
    ///   is past the joinable window
    pub async fn join_room(&self, request: &JoinRoomRequest) -> Result<RoomJoined, RoomError> {
        let nickname = normalize_nickname(request.nickname.as_deref(), Role::Joiner.default_nickname())?;
        let room_code = request.room_code.clone();

        let (handle, session_id, reconnect_token) = {
            let mut index = self.index.lock();
            let handle = index
                .rooms
                .get(&room_code)
                .cloned()
                .ok_or_else(|| GameError::RoomNotFound(room_code.clone()))?;
            let session = index
                .sessions
                .create(room_code.clone(), Role::Joiner, nickname.clone());
            (handle, session.session_id.clone(), session.reconnect_token.clone())
        };

        match handle.join(session_id.clone(), nickname).await {
            Ok(info) => {
                tracing::info!(%room_code, %session_id, "room joined");
                Ok(RoomJoined {
                    room_code,
                    session_id,
                    reconnect_token,
                    settings: info.settings,
                    status: info.status,
                })
            }
            Err(err) => {
                self.index.lock().sessions.remove(&session_id);
                Err(err)
            }
        }
    }

    /// Binds a connection's outbound channel to a session, provided
    /// `token` is the session's reconnect token.
    ///
    /// The returned [`Attachment`] carries the generation to hand back to
    /// [`detach`](Self::detach).
    ///
    /// # Errors
    /// [`SessionError::NotFound`] or [`SessionError::BadToken`], both
    /// reported as `UNKNOWN_SESSION`.
    pub async fn attach(
        &self,
        session_id: &SessionId,
        token: Option<&ReconnectToken>,
        sender: SessionSender,
    ) -> Result<Attachment, RoomError> {
        let (handle, attachment) = {
            let mut index = self.index.lock();
            index.sessions.verify(session_id, token)?;
            let handle = index.handle_for_session(session_id)?;
            (handle, index.sessions.attach(session_id)?)
        };
        handle.attach(session_id.clone(), attachment, sender).await?;
        Ok(attachment)
    }

    /// Returns `true` while `generation` is the connection the session
    /// routes to.
    pub fn is_current(&self, session_id: &SessionId, generation: u64) -> bool {
        self.index.lock().sessions.is_current(session_id, generation)
    }

    /// Reports that the connection bound with `generation` went away.
    ///
    /// Ignored when the session has since attached a newer connection.
    pub async fn detach(&self, session_id: &SessionId, generation: u64) -> Result<(), RoomError> {
        let handle = {
            let mut index = self.index.lock();
            let handle = index.handle_for_session(session_id)?;
            if !index.sessions.detach(session_id, generation)? {
                return Ok(());
            }
            handle
        };
        handle.detach(session_id.clone(), generation).await
    }

    /// Marks the session as having left. Once every seat of the room has
    /// left, the room is removed.
    pub async fn leave(&self, session_id: &SessionId) -> Result<(), RoomError> {
        let handle = {
            let mut index = self.index.lock();
            let handle = index.handle_for_session(session_id)?;
            index.sessions.leave(session_id)?;
            handle
        };
        handle.leave(session_id.clone()).await?;

        let room_code = handle.room_code().clone();
        let all_left = self.index.lock().sessions.all_left(&room_code);
        if all_left {
            tracing::info!(%room_code, "every player left");
            self.remove(&room_code).await?;
        }
        Ok(())
    }

    /// Returns a handle to a room by code.
    pub fn lookup(&self, room_code: &RoomCode) -> Option<RoomHandle> {
        self.index.lock().rooms.get(room_code).cloned()
    }

    /// Resolves a session to a clone of its room's handle.
    pub fn handle_for_session(&self, session_id: &SessionId) -> Result<RoomHandle, RoomError> {
        self.index.lock().handle_for_session(session_id)
    }

    /// Shuts a room down and forgets its sessions.
    ///
    /// # Errors
    /// [`GameError::RoomNotFound`] if no such room is active.
    pub async fn remove(&self, room_code: &RoomCode) -> Result<(), RoomError> {
        let handle = {
            let mut index = self.index.lock();
            let handle = index
                .rooms
                .remove(room_code)
                .ok_or_else(|| GameError::RoomNotFound(room_code.clone()))?;
            index.sessions.remove_room(room_code);
            handle
        };

        let _ = handle.shutdown().await;
        tracing::info!(%room_code, "room removed");
        Ok(())
    }

    /// Expires every room that tripped one of the reaper thresholds,
    /// returning their codes.
    ///
    /// Rooms are polled concurrently from a snapshot; the index is only
    /// locked to take the snapshot and to drop the expired entries. A room
    /// whose game is still running is timed out first, so its players
    /// receive `GAME_FINISHED` with reason `TIMEOUT`.
    pub async fn reap(&self) -> Vec<RoomCode> {
        let (rooms, absent) = {
            let index = self.index.lock();
            let rooms: Vec<RoomHandle> = index.rooms.values().cloned().collect();
            (rooms, index.sessions.absent_rooms())
        };

        let infos = join_all(rooms.iter().map(RoomHandle::info)).await;
        let expired: Vec<RoomHandle> = rooms
            .into_iter()
            .zip(infos)
            .filter(|(handle, info)| match info {
                // A stopped actor is reaped as well.
                Err(_) => true,
                Ok(info) => {
                    let idle = info.last_activity.elapsed();
                    idle >= self.config.idle_timeout
                        || (info.status.is_terminal() && idle >= self.config.finished_ttl)
                        || absent.contains(handle.room_code())
                }
            })
            .map(|(handle, _)| handle)
            .collect();

        join_all(expired.iter().map(RoomHandle::expire)).await;

        let mut reaped = Vec::with_capacity(expired.len());
        for handle in expired {
            let room_code = handle.room_code().clone();
            match self.remove(&room_code).await {
                Ok(()) => reaped.push(room_code),
                // Removed concurrently, e.g. both players left.
                Err(err) => tracing::debug!(%room_code, error = %err, "expired room already gone"),
            }
        }

        if !reaped.is_empty() {
            tracing::info!(count = reaped.len(), "reaped idle rooms");
        }
        reaped
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.index.lock().rooms.len()
    }

    /// Returns the number of issued sessions across all rooms.
    pub fn session_count(&self) -> usize {
        self.index.lock().sessions.len()
    }

    /// Lists all active room codes.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.index.lock().rooms.keys().cloned().collect()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

/// Draws a uniformly random six-character code from `[A-Z0-9]`.
fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    let indices: [usize; RoomCode::LEN] =
        std::array::from_fn(|_| rng.random_range(0..RoomCode::ALPHABET.len()));
    RoomCode::from_alphabet_indices(indices)
}
