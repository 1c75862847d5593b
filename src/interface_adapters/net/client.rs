use crate::domain::{PlayerId, PlayerProfile};
use crate::interface_adapters::protocol::{ClientMessage, JoinPayload, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{IntentError, RoomCommand, RoomEvent, RoomHandle, RoomJoinError};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandClosed,
    EventsClosed,
    JoinRequired,
    JoinTimeout,
    JoinRejected,
    RoomNotFound,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes each room event once and broadcasts the shared bytes; room
/// snapshots are additionally kept in a watch for lag recovery and resumes.
pub async fn room_event_serializer(
    mut event_rx: broadcast::Receiver<RoomEvent>,
    event_bytes_tx: broadcast::Sender<Utf8Bytes>,
    snapshot_latest_tx: watch::Sender<Utf8Bytes>,
) {
    loop {
        match event_rx.recv().await {
            Ok(event) => {
                let is_snapshot = matches!(event, RoomEvent::RoomState(_));
                let Some(msg) = ServerMessage::from_event(&event) else {
                    // Internal events (room teardown) end the serializer.
                    break;
                };
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        warn!(error = ?e, "failed to serialize room event");
                        continue;
                    }
                };
                let bytes = Utf8Bytes::from(txt);
                if is_snapshot {
                    let _ = snapshot_latest_tx.send(bytes.clone());
                }
                let _ = event_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "room serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub fn spawn_room_serializer(room: &RoomHandle) {
    tokio::spawn(room_event_serializer(
        room.event_tx.subscribe(),
        room.event_bytes_tx.clone(),
        room.snapshot_latest_tx.clone(),
    ));
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(NetError::JoinRejected) | Err(NetError::RoomNotFound) => {
            // The requester already got a scoped error message.
            let _ = socket.close().await;
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "join failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    span.record("player_id", ctx.player_id);
    info!(
        player_id = ctx.player_id,
        room = %ctx.room.room_code,
        "client connected"
    );

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub room: RoomHandle,
    pub command_tx: mpsc::Sender<RoomCommand>,
    pub event_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub snapshot_latest_rx: watch::Receiver<Utf8Bytes>,
    // Whether the player left explicitly, making the disconnect command moot.
    pub left: bool,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_command_full_log: Instant,
    pub last_event_lag_log: Instant,
    pub last_invalid_msg_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> Result<ConnCtx, NetError> {
    // The first meaningful client message must be the join handshake.
    let payload = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_payload(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // Resolve the target room: an explicit code joins, no code creates.
    let room = match payload.room_code.as_deref() {
        Some(code) => {
            let code = code.trim().to_ascii_uppercase();
            match state.room_registry.get_room(&code).await {
                Some(room) => room,
                None => {
                    let _ = send_message(
                        socket,
                        &ServerMessage::error("not_found", "room not found"),
                    )
                    .await;
                    return Err(NetError::RoomNotFound);
                }
            }
        }
        None => {
            let room = state.room_registry.create_room().await;
            spawn_room_serializer(&room);
            room
        }
    };

    // Subscribe before joining so this connection sees its own join
    // broadcast and everything after it.
    let event_bytes_rx = room.event_bytes_tx.subscribe();
    let snapshot_latest_rx = room.snapshot_latest_tx.subscribe();

    let resume: Option<PlayerId> = payload
        .player_id
        .as_deref()
        .and_then(|raw| raw.parse().ok());
    let profile = PlayerProfile {
        display_name: payload.display_name.trim().to_string(),
        avatar_id: payload.avatar_id.unwrap_or_else(|| "1".to_string()),
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    room.command_tx
        .send(RoomCommand::Join {
            profile,
            resume,
            reply: reply_tx,
        })
        .await
        .map_err(|_| NetError::CommandClosed)?;
    let ack = match reply_rx.await.map_err(|_| NetError::CommandClosed)? {
        Ok(ack) => ack,
        Err(reason) => {
            let _ = send_message(socket, &join_rejection(reason)).await;
            return Err(NetError::JoinRejected);
        }
    };

    send_message(
        socket,
        &ServerMessage::Identity {
            player_id: ack.player_id.to_string(),
            room_code: room.room_code.to_string(),
        },
    )
    .await?;

    // Resumed connections may have missed the join broadcast window; the
    // latest snapshot brings them current (duplicates are harmless).
    let latest = snapshot_latest_rx.borrow().clone();
    if !latest.is_empty() {
        socket
            .send(Message::Text(latest))
            .await
            .map_err(NetError::Ws)?;
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id: ack.player_id,
        command_tx: room.command_tx.clone(),
        room,
        event_bytes_rx,
        snapshot_latest_rx,
        left: false,

        msgs_in: 1,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,

        invalid_json: 0,

        last_command_full_log: now,
        last_event_lag_log: now,
        last_invalid_msg_log: now,

        close_frame: None,
    })
}

fn join_rejection(reason: RoomJoinError) -> ServerMessage {
    match reason {
        RoomJoinError::RoomFull => ServerMessage::error("capacity", "room is full"),
        RoomJoinError::DuplicateJoin => {
            ServerMessage::error("duplicate_join", "player already connected")
        }
        RoomJoinError::InvalidName => {
            ServerMessage::error("validation", "display name must be 3-12 characters")
        }
        RoomJoinError::GameInProgress => {
            ServerMessage::error("conflict", "game already in progress")
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_payload(socket: &mut WebSocket) -> Result<JoinPayload, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Join(payload)) => return Ok(payload),
                Ok(_) => {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "join required").await;
                    return Err(NetError::JoinRequired);
                }
                Err(_) => {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid join payload")
                            .await;
                    return Err(NetError::JoinRequired);
                }
            },
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

// Fire-and-forget gameplay commands; a full room inbox drops the press
// rather than stalling the socket loop.
fn send_gameplay_command(
    player_id: PlayerId,
    command_tx: &mpsc::Sender<RoomCommand>,
    command: RoomCommand,
    last_command_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match command_tx.try_send(command) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_)) => {
            if should_log(last_command_full_log) {
                warn!(player_id, "room command channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::CommandClosed),
    }
}

// Host-only intents await the room's verdict so permission errors reach
// only the requester; stale intents stay silent per the room's rules.
async fn send_host_command(
    socket: &mut WebSocket,
    command_tx: &mpsc::Sender<RoomCommand>,
    build: impl FnOnce(oneshot::Sender<Result<(), IntentError>>) -> RoomCommand,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> Result<LoopControl, NetError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    command_tx
        .send(build(reply_tx))
        .await
        .map_err(|_| NetError::CommandClosed)?;
    match reply_rx.await.map_err(|_| NetError::CommandClosed)? {
        Ok(()) | Err(IntentError::Stale) => Ok(LoopControl::Continue),
        Err(IntentError::NotHost) => {
            let bytes = send_message(
                socket,
                &ServerMessage::error("permission", "only the host can do that"),
            )
            .await?;
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            Ok(LoopControl::Continue)
        }
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        command_tx,
        event_bytes_rx,
        snapshot_latest_rx,
        left,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_command_full_log,
        last_event_lag_log,
        last_invalid_msg_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    player_id,
                    command_tx,
                    left,
                    msgs_in,
                    bytes_in,
                    msgs_out,
                    bytes_out,
                    invalid_json,
                    last_command_full_log,
                    last_invalid_msg_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            event = event_bytes_rx.recv() => {
                match event {
                    Ok(bytes) => match forward_event_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_event_lag_log) {
                            warn!(missed = n, "room events lagged; sending snapshot");
                        }
                        // Resync strategy: send the latest room snapshot.
                        let latest = snapshot_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            match forward_event_bytes(latest, socket, msgs_out, bytes_out).await {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Room task is gone; tell the client and hang up.
                        *close_frame = Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "room closed".into(),
                        });
                        fatal = Some(NetError::EventsClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if !*left {
        // The room folds a dropped connection into its round logic.
        let _ = command_tx.send(RoomCommand::Disconnect { player_id }).await;
    }

    debug!(
        player_id,
        msgs_in = *msgs_in,
        msgs_out = *msgs_out,
        bytes_in = *bytes_in,
        bytes_out = *bytes_out,
        invalid_json = *invalid_json,
        "connection stats"
    );
    info!(player_id, "client disconnected");

    match fatal {
        // A closed room is an orderly shutdown for the connection.
        Some(NetError::EventsClosed) | None => Ok(()),
        Some(err) => Err(err),
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, axum::Error>>,
    player_id: PlayerId,
    command_tx: &mpsc::Sender<RoomCommand>,
    left: &mut bool,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
    invalid_json: &mut u32,
    last_command_full_log: &mut Instant,
    last_invalid_msg_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Repeated joins after bootstrap keep the session stable.
                        if should_log(last_invalid_msg_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Start) => {
                        send_host_command(
                            socket,
                            command_tx,
                            |reply| RoomCommand::Start { player_id, reply },
                            msgs_out,
                            bytes_out,
                        )
                        .await
                    }
                    Ok(ClientMessage::Restart) => {
                        send_host_command(
                            socket,
                            command_tx,
                            |reply| RoomCommand::Restart { player_id, reply },
                            msgs_out,
                            bytes_out,
                        )
                        .await
                    }
                    Ok(ClientMessage::PressColor { color }) => send_gameplay_command(
                        player_id,
                        command_tx,
                        RoomCommand::PressColor { player_id, color },
                        last_command_full_log,
                    ),
                    Ok(ClientMessage::SubmitSequence) => send_gameplay_command(
                        player_id,
                        command_tx,
                        RoomCommand::SubmitSequence { player_id },
                        last_command_full_log,
                    ),
                    Ok(ClientMessage::Leave) => {
                        command_tx
                            .send(RoomCommand::Leave { player_id })
                            .await
                            .map_err(|_| NetError::CommandClosed)?;
                        *left = true;
                        *close_frame = Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "left room".into(),
                        });
                        Ok(LoopControl::Disconnect)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_msg_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_event_bytes(
    event_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = event_msg.len();
    match socket
        .send(Message::Text(event_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send room event");
            LoopControl::Disconnect
        }
    }
}
