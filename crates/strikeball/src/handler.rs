//! Per-connection handler: intent routing and session binding.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound queue. The
//! flow is:
//!   1. Receive a frame and decode an `Envelope<ClientIntent>`
//!   2. `CREATE_ROOM` / `JOIN_ROOM` go through the registry, reply
//!      point-to-point, then bind the connection to the new session
//!   3. Any intent carrying a `sessionId` binds the connection to that
//!      session (attach + personal snapshot), then runs against the
//!      session's room actor. Binding a seat the connection is not
//!      currently routed for takes the seat's reconnect token
//!   4. On close or idle timeout, detach the bound session

use std::sync::Arc;

use strikeball_protocol::{
    Channel, ClientIntent, Codec, Envelope, ErrorCode, ProtocolError, ReconnectToken, ServerEvent,
    SessionId,
};
use strikeball_room::{PlayerIntent, RoomError, RoomOutbound};
use strikeball_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::StrikeballError;
use crate::server::ServerState;

/// The session a connection currently speaks for.
#[derive(Debug, Clone)]
struct Binding {
    session_id: SessionId,
    generation: u64,
}

/// Per-connection state shared by the message loop.
struct ConnectionContext<C: Codec> {
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    /// Outbound queue drained by the writer task. Clones are handed to
    /// room actors on attach.
    outbound: mpsc::UnboundedSender<RoomOutbound>,
    binding: Option<Binding>,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), StrikeballError> {
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "connection opened");

    let conn = Arc::new(conn);
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        Arc::clone(&state),
        outbound_rx,
    ));

    let mut ctx = ConnectionContext {
        conn,
        state,
        outbound,
        binding: None,
    };

    let result = ctx.message_loop(conn_id).await;

    // Presence follows the connection; the game itself is untouched.
    if let Some(binding) = ctx.binding.take() {
        let detached = ctx
            .state
            .registry
            .detach(&binding.session_id, binding.generation)
            .await;
        if let Err(e) = detached {
            tracing::debug!(%conn_id, session_id = %binding.session_id, error = %e, "detach skipped");
        }
    }

    writer.abort();
    let _ = ctx.conn.close().await;
    tracing::info!(%conn_id, "connection closed");
    result
}

/// Encodes queued events and writes them to the socket, in order.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbound: mpsc::UnboundedReceiver<RoomOutbound>,
) {
    while let Some(message) = outbound.recv().await {
        let envelope = message.into_envelope();
        if let Err(e) = send_envelope(&conn, &state.codec, &envelope).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
}

/// Writes one envelope, as a text frame when the codec produces text.
async fn send_envelope<C: Codec>(
    conn: &WebSocketConnection,
    codec: &C,
    envelope: &Envelope<ServerEvent>,
) -> Result<(), StrikeballError> {
    let bytes = codec.encode(envelope)?;
    if codec.is_textual() {
        let text = String::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMessage(format!("codec produced non-UTF-8 text: {e}")))?;
        conn.send_text(text).await?;
    } else {
        conn.send(&bytes).await?;
    }
    Ok(())
}

impl<C: Codec> ConnectionContext<C> {
    async fn message_loop(&mut self, conn_id: ConnectionId) -> Result<(), StrikeballError> {
        loop {
            let data = match tokio::time::timeout(
                self.state.connection_timeout,
                self.conn.recv(),
            )
            .await
            {
                Ok(Ok(Some(data))) => data,
                Ok(Ok(None)) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::info!(%conn_id, "connection timed out");
                    return Ok(());
                }
            };

            let envelope: Envelope<ClientIntent> = match self.state.codec.decode(&data) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                    self.reply_error(ErrorCode::InvalidMessage, e.to_string()).await?;
                    continue;
                }
            };

            let intent = envelope.body;
            tracing::debug!(%conn_id, kind = intent.kind(), "intent received");
            self.dispatch(intent).await?;
        }
    }

    /// Routes one decoded intent. Game-level failures become `ERROR`
    /// events; only transport and codec failures end the connection.
    async fn dispatch(&mut self, intent: ClientIntent) -> Result<(), StrikeballError> {
        // Every intent naming a seat must first prove this connection
        // speaks for it.
        if let Some(session_id) = intent.session_id() {
            let session_id = session_id.clone();
            if !self.bind(&session_id, intent.reconnect_token()).await? {
                return Ok(());
            }
        }

        match intent {
            ClientIntent::CreateRoom(request) => {
                match self.state.registry.create_room(&request) {
                    Ok(created) => {
                        let session_id = created.session_id.clone();
                        let token = created.reconnect_token.clone();
                        self.push(&session_id, ServerEvent::RoomCreated(created));
                        self.bind(&session_id, Some(&token)).await?;
                    }
                    Err(e) => self.report(None, &e).await?,
                }
            }

            ClientIntent::JoinRoom(request) => {
                match self.state.registry.join_room(&request).await {
                    Ok(joined) => {
                        let session_id = joined.session_id.clone();
                        let token = joined.reconnect_token.clone();
                        self.push(&session_id, ServerEvent::RoomJoined(joined));
                        self.bind(&session_id, Some(&token)).await?;
                    }
                    Err(e) => self.report(None, &e).await?,
                }
            }

            ClientIntent::LeaveRoom(request) => {
                let session_id = request.session_id;
                match self.state.registry.leave(&session_id).await {
                    // The seat is released; a later close must not detach it.
                    Ok(()) => self.binding = None,
                    Err(e) => self.report(Some(&session_id), &e).await?,
                }
            }

            ClientIntent::SetReady(request) => {
                self.play(request.session_id, PlayerIntent::SetReady(request.ready))
                    .await?;
            }
            ClientIntent::SetAnswer(request) => {
                self.play(request.session_id, PlayerIntent::SetAnswer(request.answer))
                    .await?;
            }
            ClientIntent::SubmitGuess(request) => {
                self.play(request.session_id, PlayerIntent::SubmitGuess(request.guess))
                    .await?;
            }
            ClientIntent::Abandon(request) => {
                self.play(request.session_id, PlayerIntent::Abandon).await?;
            }
            ClientIntent::GetStatus(request) => {
                self.play(request.session_id, PlayerIntent::GetStatus).await?;
            }
        }
        Ok(())
    }

    /// Applies `intent` on the room of the (already bound) session.
    async fn play(&mut self, session_id: SessionId, intent: PlayerIntent) -> Result<(), StrikeballError> {
        let result = match self.state.registry.handle_for_session(&session_id) {
            Ok(handle) => handle.intent(session_id.clone(), intent).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            // The room already told the submitter.
            Err(RoomError::Rejected(_)) => Ok(()),
            Err(e) => self.report(Some(&session_id), &e).await,
        }
    }

    /// Makes `session_id` the session this connection speaks for.
    ///
    /// A connection still routed for the session passes without a token.
    /// Anything else needs the session's reconnect token: a seat this
    /// connection never held, and a seat since taken over by a newer
    /// connection. Returns `false` (after reporting `UNKNOWN_SESSION`)
    /// when the session cannot be attached.
    async fn bind(
        &mut self,
        session_id: &SessionId,
        token: Option<&ReconnectToken>,
    ) -> Result<bool, StrikeballError> {
        if let Some(binding) = &self.binding {
            if &binding.session_id == session_id {
                if self.state.registry.is_current(session_id, binding.generation) {
                    return Ok(true);
                }
                tracing::debug!(
                    conn_id = %self.conn.id(),
                    %session_id,
                    generation = binding.generation,
                    "binding superseded by a newer connection"
                );
                self.binding = None;
                if token.is_none() {
                    self.reply(
                        None,
                        ServerEvent::error(
                            ErrorCode::UnknownSession,
                            format!("session {session_id} is in use by another connection"),
                            None,
                        ),
                    )
                    .await?;
                    return Ok(false);
                }
            }
        }

        let registry = &self.state.registry;
        let attached = registry.attach(session_id, token, self.outbound.clone()).await;
        match attached {
            Ok(attachment) => {
                if let Some(previous) = self.binding.take() {
                    if let Err(e) = registry.detach(&previous.session_id, previous.generation).await {
                        tracing::debug!(session_id = %previous.session_id, error = %e, "release of previous session skipped");
                    }
                }
                tracing::debug!(
                    conn_id = %self.conn.id(),
                    %session_id,
                    generation = attachment.generation,
                    "connection bound"
                );
                self.binding = Some(Binding {
                    session_id: session_id.clone(),
                    generation: attachment.generation,
                });
                Ok(true)
            }
            Err(e) => {
                // Never echo a seat this connection does not own.
                self.report(None, &e).await?;
                Ok(false)
            }
        }
    }

    /// Queues an event on the session channel of `session_id`.
    fn push(&self, session_id: &SessionId, event: ServerEvent) {
        let _ = self.outbound.send(RoomOutbound {
            channel: Channel::Session(session_id.clone()),
            event,
        });
    }

    /// Reports a failed intent to this connection only.
    async fn report(&self, session_id: Option<&SessionId>, err: &RoomError) -> Result<(), StrikeballError> {
        tracing::debug!(conn_id = %self.conn.id(), code = %err.code(), error = %err, "intent failed");
        self.reply(session_id, err.to_event()).await
    }

    async fn reply_error(&self, code: ErrorCode, message: String) -> Result<(), StrikeballError> {
        self.reply(None, ServerEvent::error(code, message, None)).await
    }

    /// Sends a point-to-point event. It is queued on the channel of
    /// `session_id` (or the bound session) behind any pending room events;
    /// with neither it is written straight to the socket with no channel.
    async fn reply(&self, session_id: Option<&SessionId>, event: ServerEvent) -> Result<(), StrikeballError> {
        match session_id.or(self.binding.as_ref().map(|b| &b.session_id)) {
            Some(session_id) => {
                self.push(session_id, event);
                Ok(())
            }
            None => {
                let envelope = Envelope {
                    body: event,
                    channel: None,
                    timestamp: strikeball_protocol::unix_millis(),
                };
                send_envelope(&self.conn, &self.state.codec, &envelope).await
            }
        }
    }
}
