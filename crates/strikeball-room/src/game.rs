//! The authoritative per-room game: status, turn pointer, secrets and
//! history.
//!
//! [`Game`] is a plain synchronous state machine. Every transition takes
//! the submitter's session id, checks its guards against the live state,
//! and either mutates and returns the events to deliver, or returns a
//! [`GameError`] and leaves the state exactly as it was. It performs no
//! I/O; the room actor owns an instance and does the delivery.
//!
//! Guards are checked in a fixed order: membership first
//! (`UNKNOWN_SESSION`), then status (`INVALID_STATE`), then turn
//! ownership, then input shape.

use strikeball_protocol::{
    AnswerSet, ConnectionStatus, FinishReason, GameFinished, GameStateInfo, GameStatus,
    NewGuess, PlayerConnection, PlayerReady, Recipient, RoomCode, ServerEvent, SessionId,
    StateChange, Turn, unix_millis,
};
use strikeball_session::Role;

use crate::judge;
use crate::rules::RuleConfiguration;
use crate::GameError;

/// Events produced by one transition, in delivery order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

/// One player's seat.
#[derive(Debug, Clone)]
struct Seat {
    session_id: SessionId,
    nickname: String,
    secret: Option<String>,
    ready: bool,
}

impl Seat {
    fn new(session_id: SessionId, nickname: String) -> Self {
        Self {
            session_id,
            nickname,
            secret: None,
            ready: false,
        }
    }
}

/// How a terminal game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` only for [`FinishReason::Timeout`].
    pub winner: Option<SessionId>,
    pub reason: FinishReason,
}

/// The state machine for one room.
#[derive(Debug, Clone)]
pub struct Game {
    room_code: RoomCode,
    rules: RuleConfiguration,
    status: GameStatus,
    creator: Seat,
    joiner: Option<Seat>,
    /// Set if and only if `status == InProgress`.
    current_turn: Option<SessionId>,
    /// Append-only; turn numbers are `1..=history.len()`.
    history: Vec<Turn>,
    outcome: Option<Outcome>,
}

impl Game {
    /// A fresh room waiting for its second player.
    pub fn new(
        room_code: RoomCode,
        rules: RuleConfiguration,
        creator: SessionId,
        creator_nickname: String,
    ) -> Self {
        Self {
            room_code,
            rules,
            status: GameStatus::WaitingForJoiner,
            creator: Seat::new(creator, creator_nickname),
            joiner: None,
            current_turn: None,
            history: Vec::new(),
            outcome: None,
        }
    }

    // -- accessors --------------------------------------------------------

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn rules(&self) -> &RuleConfiguration {
        &self.rules
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn current_turn(&self) -> Option<&SessionId> {
        self.current_turn.as_ref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn creator_id(&self) -> &SessionId {
        &self.creator.session_id
    }

    pub fn joiner_id(&self) -> Option<&SessionId> {
        self.joiner.as_ref().map(|s| &s.session_id)
    }

    /// Which seat `session_id` holds, if any.
    pub fn role_of(&self, session_id: &SessionId) -> Option<Role> {
        if self.creator.session_id == *session_id {
            Some(Role::Creator)
        } else if self.joiner_id() == Some(session_id) {
            Some(Role::Joiner)
        } else {
            None
        }
    }

    /// Returns `true` once the player has submitted a secret. Never
    /// exposes the secret itself.
    pub fn has_secret(&self, session_id: &SessionId) -> bool {
        self.seat(session_id).is_some_and(|s| s.secret.is_some())
    }

    /// Whether the player's ready flag is currently raised.
    pub fn is_ready(&self, session_id: &SessionId) -> bool {
        self.seat(session_id).is_some_and(|s| s.ready)
    }

    // -- transitions ------------------------------------------------------

    /// Seats the second player. `WAITING_FOR_JOINER → WAITING_FOR_READY`.
    pub fn join(&mut self, session_id: SessionId, nickname: String) -> Result<Outbound, GameError> {
        if !self.status.is_joinable() || self.joiner.is_some() {
            return Err(match self.status {
                GameStatus::WaitingForJoiner | GameStatus::WaitingForReady => {
                    GameError::RoomFull(self.room_code.clone())
                }
                _ => GameError::RoomClosed(self.room_code.clone()),
            });
        }

        self.joiner = Some(Seat::new(session_id, nickname));
        self.status = GameStatus::WaitingForReady;
        Ok(vec![(Recipient::Room, self.state_change())])
    }

    /// Raises or lowers the submitter's ready flag.
    ///
    /// In `WAITING_FOR_READY`, the moment both flags are up the game moves
    /// to `SETTING_ANSWERS` and both flags drop back to `false`, all inside
    /// this one call. In `SETTING_ANSWERS` and `IN_PROGRESS` the flag is
    /// only recorded.
    pub fn set_ready(&mut self, session_id: &SessionId, ready: bool) -> Result<Outbound, GameError> {
        self.require_member(session_id)?;
        match self.status {
            GameStatus::WaitingForReady | GameStatus::SettingAnswers | GameStatus::InProgress => {}
            status => {
                return Err(GameError::InvalidState {
                    action: "change readiness",
                    status,
                });
            }
        }

        let seat = self.seat_mut(session_id)?;
        seat.ready = ready;
        let nickname = seat.nickname.clone();

        let mut events = vec![(
            Recipient::Room,
            ServerEvent::PlayerReady(PlayerReady {
                session_id: session_id.clone(),
                ready,
                nickname,
            }),
        )];

        let both_ready =
            self.creator.ready && self.joiner.as_ref().is_some_and(|j| j.ready);
        if self.status == GameStatus::WaitingForReady && both_ready {
            self.creator.ready = false;
            if let Some(joiner) = self.joiner.as_mut() {
                joiner.ready = false;
            }
            self.status = GameStatus::SettingAnswers;
            events.push((Recipient::Room, self.state_change()));
        }

        Ok(events)
    }

    /// Stores the submitter's secret. Once both are set the game moves to
    /// `IN_PROGRESS` with the creator to guess first.
    pub fn set_secret(&mut self, session_id: &SessionId, answer: &str) -> Result<Outbound, GameError> {
        self.require_member(session_id)?;
        if self.status != GameStatus::SettingAnswers {
            return Err(GameError::InvalidState {
                action: "set a secret",
                status: self.status,
            });
        }
        if self.has_secret(session_id) {
            return Err(GameError::AlreadySet);
        }
        self.rules.validate(answer).map_err(GameError::InvalidSecret)?;

        self.seat_mut(session_id)?.secret = Some(answer.to_string());

        let all_set = self.creator.secret.is_some()
            && self.joiner.as_ref().is_some_and(|j| j.secret.is_some());

        let mut events = vec![(
            Recipient::Room,
            ServerEvent::AnswerSet(AnswerSet {
                session_id: session_id.clone(),
                answer_set: true,
                all_answers_set: all_set,
            }),
        )];

        if all_set {
            self.status = GameStatus::InProgress;
            self.current_turn = Some(self.creator.session_id.clone());
            events.push((Recipient::Room, self.state_change()));
        }

        Ok(events)
    }

    /// Scores the turn holder's guess against the opponent's secret.
    ///
    /// A full match finishes the game with the guesser as winner;
    /// anything else passes the turn.
    pub fn submit_guess(&mut self, session_id: &SessionId, guess: &str) -> Result<Outbound, GameError> {
        self.require_member(session_id)?;
        if self.status != GameStatus::InProgress {
            return Err(GameError::InvalidState {
                action: "submit a guess",
                status: self.status,
            });
        }
        if self.current_turn.as_ref() != Some(session_id) {
            return Err(GameError::NotYourTurn);
        }
        self.rules.validate(guess).map_err(GameError::InvalidGuess)?;

        let opponent = self.opponent_of(session_id).cloned().ok_or(GameError::InvalidState {
            action: "submit a guess",
            status: self.status,
        })?;
        let secret = opponent.secret.as_deref().ok_or(GameError::InvalidState {
            action: "submit a guess",
            status: self.status,
        })?;

        let score = judge::score(secret, guess)?;
        let result = score.to_string();
        let turn_number = self.history.len() as u32 + 1;
        self.history.push(Turn {
            turn_number,
            guesser_session_id: session_id.clone(),
            guess: guess.to_string(),
            result: result.clone(),
            timestamp: unix_millis(),
        });

        let won = score.is_full_match(self.rules.digits());
        let next_turn = (!won).then(|| opponent.session_id.clone());

        let mut events = vec![(
            Recipient::Room,
            ServerEvent::NewGuess(NewGuess {
                guesser: session_id.clone(),
                guess: guess.to_string(),
                result,
                turn_number,
                next_turn: next_turn.clone(),
            }),
        )];

        if won {
            events.extend(self.finish(GameStatus::Finished, Some(session_id.clone()), FinishReason::Win));
        } else {
            self.current_turn = next_turn;
        }

        Ok(events)
    }

    /// Ends the game in the opponent's favour.
    pub fn abandon(&mut self, session_id: &SessionId) -> Result<Outbound, GameError> {
        self.require_member(session_id)?;
        if !self.status.is_abandonable() {
            return Err(GameError::InvalidState {
                action: "abandon",
                status: self.status,
            });
        }

        let winner = self.opponent_of(session_id).map(|s| s.session_id.clone());
        Ok(self.finish(GameStatus::Abandoned, winner, FinishReason::Abandon))
    }

    /// Snapshot reply to `GET_STATUS`, addressed to the submitter only.
    pub fn get_status(&self, session_id: &SessionId) -> Result<Outbound, GameError> {
        self.require_member(session_id)?;
        Ok(vec![(
            Recipient::Session(session_id.clone()),
            ServerEvent::GameStatus(self.status_info()),
        )])
    }

    /// Reaps the game: a non-terminal game becomes `ABANDONED` with reason
    /// `TIMEOUT` and no winner. Terminal games are left alone.
    pub fn expire(&mut self) -> Outbound {
        if self.status.is_terminal() {
            return Vec::new();
        }
        self.finish(GameStatus::Abandoned, None, FinishReason::Timeout)
    }

    /// Presence announcement for a player. Never changes the status.
    pub fn presence(
        &self,
        session_id: &SessionId,
        connection_status: ConnectionStatus,
    ) -> Result<Outbound, GameError> {
        let seat = self
            .seat(session_id)
            .ok_or_else(|| GameError::UnknownSession(session_id.clone()))?;
        Ok(vec![(
            Recipient::Room,
            ServerEvent::presence(PlayerConnection {
                session_id: session_id.clone(),
                nickname: seat.nickname.clone(),
                connected: connection_status.is_connected(),
                connection_status,
            }),
        )])
    }

    // -- snapshots --------------------------------------------------------

    /// The `STATE_CHANGE` event describing the current state.
    pub fn state_change(&self) -> ServerEvent {
        ServerEvent::StateChange(StateChange {
            status: self.status,
            current_turn: self.current_turn.clone(),
            room_code: self.room_code.clone(),
            creator_ready: self.creator.ready,
            joiner_ready: self.joiner.as_ref().is_some_and(|j| j.ready),
        })
    }

    /// The `GAME_STATUS` payload describing the current state.
    pub fn status_info(&self) -> GameStateInfo {
        GameStateInfo {
            room_code: self.room_code.clone(),
            status: self.status,
            current_turn: self.current_turn.clone(),
            creator_ready: self.creator.ready,
            joiner_ready: self.joiner.as_ref().is_some_and(|j| j.ready),
            turn_count: self.history.len() as u32,
        }
    }

    // -- internals --------------------------------------------------------

    /// Moves to a terminal status and builds `STATE_CHANGE` followed by
    /// `GAME_FINISHED`, the only event that reveals secrets.
    fn finish(
        &mut self,
        status: GameStatus,
        winner: Option<SessionId>,
        reason: FinishReason,
    ) -> Outbound {
        self.status = status;
        self.current_turn = None;
        self.outcome = Some(Outcome {
            winner: winner.clone(),
            reason,
        });

        tracing::info!(
            room_code = %self.room_code,
            %status,
            ?reason,
            turns = self.history.len(),
            "game over"
        );

        let finished = GameFinished {
            winner,
            reason,
            game_history: self.history.clone(),
            total_turns: self.history.len() as u32,
            creator_answer: self.creator.secret.clone(),
            joiner_answer: self.joiner.as_ref().and_then(|j| j.secret.clone()),
        };
        vec![
            (Recipient::Room, self.state_change()),
            (Recipient::Room, ServerEvent::GameFinished(finished)),
        ]
    }

    fn require_member(&self, session_id: &SessionId) -> Result<(), GameError> {
        match self.role_of(session_id) {
            Some(_) => Ok(()),
            None => Err(GameError::UnknownSession(session_id.clone())),
        }
    }

    fn seat(&self, session_id: &SessionId) -> Option<&Seat> {
        match self.role_of(session_id)? {
            Role::Creator => Some(&self.creator),
            Role::Joiner => self.joiner.as_ref(),
        }
    }

    fn seat_mut(&mut self, session_id: &SessionId) -> Result<&mut Seat, GameError> {
        match self.role_of(session_id) {
            Some(Role::Creator) => Ok(&mut self.creator),
            Some(Role::Joiner) => self
                .joiner
                .as_mut()
                .ok_or_else(|| GameError::UnknownSession(session_id.clone())),
            None => Err(GameError::UnknownSession(session_id.clone())),
        }
    }

    fn opponent_of(&self, session_id: &SessionId) -> Option<&Seat> {
        match self.role_of(session_id)? {
            Role::Creator => self.joiner.as_ref(),
            Role::Joiner => Some(&self.creator),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
