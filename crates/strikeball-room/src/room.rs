//! Room actor: an isolated Tokio task that owns one [`Game`].
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Intents from both players queue up in that
//! channel and are applied one at a time, so no two transitions on the
//! same game ever overlap. Different rooms share nothing and run in
//! parallel.

use std::collections::HashMap;
use std::time::Instant;

use strikeball_protocol::{
    Channel, ConnectionStatus, Envelope, GameSettings, GameStatus, Recipient, RoomCode, ServerEvent, SessionId,
};
use strikeball_session::Attachment;
use tokio::sync::{mpsc, oneshot};

use crate::game::{Game, Outbound};
use crate::{GameError, RoomError};

/// An outbound event from a room actor to one connection handler,
/// tagged with the channel it was routed on.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomOutbound {
    pub channel: Channel,
    pub event: ServerEvent,
}

impl RoomOutbound {
    /// Stamps the event into a wire envelope.
    pub fn into_envelope(self) -> Envelope<ServerEvent> {
        Envelope::routed(self.event, self.channel)
    }
}

/// Channel sender for delivering outbound events to a session's connection.
pub type SessionSender = mpsc::UnboundedSender<RoomOutbound>;

/// The game intents a seated player can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerIntent {
    SetReady(bool),
    SetAnswer(String),
    SubmitGuess(String),
    Abandon,
    GetStatus,
}

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/response; the caller
/// waits for the actor's answer on it.
pub(crate) enum RoomCommand {
    /// Seat the second player.
    Join {
        session_id: SessionId,
        nickname: String,
        reply: oneshot::Sender<Result<RoomInfo, GameError>>,
    },

    /// Apply a player intent. Rejections are also delivered to the
    /// submitter as an `ERROR` event.
    Intent {
        session_id: SessionId,
        intent: PlayerIntent,
        reply: oneshot::Sender<Result<(), GameError>>,
    },

    /// Route a session's events to a new connection.
    Attach {
        session_id: SessionId,
        attachment: Attachment,
        sender: SessionSender,
        reply: oneshot::Sender<Result<(), GameError>>,
    },

    /// The connection with this attach generation went away.
    Detach {
        session_id: SessionId,
        generation: u64,
        reply: oneshot::Sender<()>,
    },

    /// The player left the room.
    Leave {
        session_id: SessionId,
        reply: oneshot::Sender<()>,
    },

    /// Request the current room metadata.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Time the game out (no-op when already terminal).
    Expire { reply: oneshot::Sender<()> },

    /// Stop the actor.
    Shutdown,
}

/// A snapshot of room metadata, as used by the registry and reaper.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub status: GameStatus,
    pub settings: GameSettings,
    /// Seated players (1 or 2).
    pub player_count: usize,
    /// Sessions with a connection currently routed.
    pub connected: usize,
    /// When the last join, intent or attach arrived.
    pub last_activity: Instant,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone; callers clone it out of the registry so they can await
/// the actor without holding the registry lock.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// Sends a command and waits for the actor's reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }

    /// Seats the second player, returning the room as it stands after
    /// joining.
    pub async fn join(&self, session_id: SessionId, nickname: String) -> Result<RoomInfo, RoomError> {
        let result = self
            .request(|reply| RoomCommand::Join {
                session_id,
                nickname,
                reply,
            })
            .await?;
        Ok(result?)
    }

    /// Applies a player intent.
    pub async fn intent(&self, session_id: SessionId, intent: PlayerIntent) -> Result<(), RoomError> {
        let result = self
            .request(|reply| RoomCommand::Intent {
                session_id,
                intent,
                reply,
            })
            .await?;
        Ok(result?)
    }

    /// Routes the session's events to `sender` and announces presence.
    ///
    /// An attach older than the one already routed is ignored, so two
    /// racing reconnects settle on the newest generation.
    pub async fn attach(
        &self,
        session_id: SessionId,
        attachment: Attachment,
        sender: SessionSender,
    ) -> Result<(), RoomError> {
        let result = self
            .request(|reply| RoomCommand::Attach {
                session_id,
                attachment,
                sender,
                reply,
            })
            .await?;
        Ok(result?)
    }

    /// Stops routing to the session and announces the disconnect, unless
    /// a newer connection has been routed since `generation`.
    pub async fn detach(&self, session_id: SessionId, generation: u64) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Detach {
            session_id,
            generation,
            reply,
        })
        .await
    }

    /// Stops routing to the session and announces that it left.
    pub async fn leave(&self, session_id: SessionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { session_id, reply })
            .await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::Info { reply }).await
    }

    /// Times the game out.
    pub async fn expire(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Expire { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))
    }
}

/// Where a session's events currently go.
struct Route {
    generation: u64,
    sender: SessionSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    game: Game,
    /// At most one connection per session: the newest attach.
    routes: HashMap<SessionId, Route>,
    last_activity: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        let room_code = self.game.room_code().clone();
        tracing::info!(%room_code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    session_id,
                    nickname,
                    reply,
                } => {
                    self.touch();
                    let result = self.handle_join(session_id, nickname);
                    let _ = reply.send(result);
                }
                RoomCommand::Intent {
                    session_id,
                    intent,
                    reply,
                } => {
                    self.touch();
                    let result = self.handle_intent(&session_id, intent);
                    let _ = reply.send(result);
                }
                RoomCommand::Attach {
                    session_id,
                    attachment,
                    sender,
                    reply,
                } => {
                    self.touch();
                    let result = self.handle_attach(session_id, attachment, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Detach {
                    session_id,
                    generation,
                    reply,
                } => {
                    let current = self
                        .routes
                        .get(&session_id)
                        .is_some_and(|route| route.generation == generation);
                    if current {
                        self.handle_detach(&session_id);
                    }
                    let _ = reply.send(());
                }
                RoomCommand::Leave { session_id, reply } => {
                    // Leaving is presence only; the seat and game stay.
                    self.touch();
                    self.handle_detach(&session_id);
                    let _ = reply.send(());
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::Expire { reply } => {
                    let events = self.game.expire();
                    if !events.is_empty() {
                        tracing::info!(%room_code, "room expired");
                    }
                    self.dispatch(events);
                    let _ = reply.send(());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_code, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(%room_code, "room actor stopped");
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn handle_join(&mut self, session_id: SessionId, nickname: String) -> Result<RoomInfo, GameError> {
        let events = self.game.join(session_id.clone(), nickname)?;
        tracing::info!(
            room_code = %self.game.room_code(),
            %session_id,
            "player joined"
        );
        self.dispatch(events);
        Ok(self.info())
    }

    fn handle_intent(&mut self, session_id: &SessionId, intent: PlayerIntent) -> Result<(), GameError> {
        let result = match intent {
            PlayerIntent::SetReady(ready) => self.game.set_ready(session_id, ready),
            PlayerIntent::SetAnswer(answer) => self.game.set_secret(session_id, &answer),
            PlayerIntent::SubmitGuess(guess) => self.game.submit_guess(session_id, &guess),
            PlayerIntent::Abandon => self.game.abandon(session_id),
            PlayerIntent::GetStatus => self.game.get_status(session_id),
        };

        match result {
            Ok(events) => {
                self.dispatch(events);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(
                    room_code = %self.game.room_code(),
                    %session_id,
                    error = %err,
                    "intent rejected"
                );
                self.dispatch(vec![(Recipient::Session(session_id.clone()), err.to_event())]);
                Err(err)
            }
        }
    }

    fn handle_attach(
        &mut self,
        session_id: SessionId,
        attachment: Attachment,
        sender: SessionSender,
    ) -> Result<(), GameError> {
        let superseded = self
            .routes
            .get(&session_id)
            .is_some_and(|route| route.generation > attachment.generation);
        if superseded {
            tracing::debug!(%session_id, generation = attachment.generation, "late attach ignored");
            return Ok(());
        }

        let presence = self.game.presence(&session_id, attachment.status)?;
        self.routes.insert(
            session_id.clone(),
            Route {
                generation: attachment.generation,
                sender,
            },
        );

        // The attaching player resyncs from a personal snapshot first.
        let snapshot = (Recipient::Session(session_id), self.game.state_change());
        self.dispatch(vec![snapshot]);
        self.dispatch(presence);
        Ok(())
    }

    fn handle_detach(&mut self, session_id: &SessionId) {
        self.routes.remove(session_id);
        match self.game.presence(session_id, ConnectionStatus::Disconnected) {
            Ok(events) => self.dispatch(events),
            Err(err) => tracing::debug!(%session_id, error = %err, "detach for unseated session"),
        }
    }

    /// Delivers events to the routed channels. Room events go to every
    /// attached session; session events go to that session only. A
    /// receiver that is gone is skipped.
    fn dispatch(&self, events: Outbound) {
        for (recipient, event) in events {
            match recipient {
                Recipient::Room => {
                    let channel = Channel::Room(self.game.room_code().clone());
                    for route in self.routes.values() {
                        let _ = route.sender.send(RoomOutbound {
                            channel: channel.clone(),
                            event: event.clone(),
                        });
                    }
                }
                Recipient::Session(session_id) => {
                    if let Some(route) = self.routes.get(&session_id) {
                        let _ = route.sender.send(RoomOutbound {
                            channel: Channel::Session(session_id),
                            event,
                        });
                    }
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.game.room_code().clone(),
            status: self.game.status(),
            settings: self.game.rules().settings(),
            player_count: if self.game.joiner_id().is_some() { 2 } else { 1 },
            connected: self.routes.len(),
            last_activity: self.last_activity,
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` controls backpressure: if the channel fills up,
/// senders wait.
pub(crate) fn spawn_room(game: Game, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let room_code = game.room_code().clone();

    let actor = RoomActor {
        game,
        routes: HashMap::new(),
        last_activity: Instant::now(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_code,
        sender: tx,
    }
}
