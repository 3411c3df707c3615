//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::http::routes::AppError;
use crate::http::signature::verify_ticket;
use crate::util::rate_limit::ActionRateLimiter;
use crate::ws::protocol::{ClientMsg, RoomMessage, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub match_id: String,
    pub player_id: String,
    /// Session ticket issued by the strategy layer
    pub ticket: String,
}

/// WebSocket upgrade handler
///
/// The ticket is checked before the upgrade headers so an unauthorized
/// caller gets 401 whether or not it speaks WebSocket.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Verify the session ticket before upgrading
    if let Err(e) = verify_ticket(
        &state.config.internal_shared_secret,
        &query.match_id,
        &query.player_id,
        &query.ticket,
    ) {
        error!(match_id = %query.match_id, error = %e, "WebSocket ticket rejected");
        return AppError::Unauthorized.into_response();
    }

    match ws {
        Ok(ws) => {
            info!(match_id = %query.match_id, player_id = %query.player_id, "WebSocket upgrade for combat participant");
            ws.on_upgrade(move |socket| handle_socket(socket, query.match_id, query.player_id, state))
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, match_id: String, player_id: String, state: AppState) {
    info!(match_id = %match_id, player_id = %player_id, "New WebSocket connection");

    // Subscribe before the catch-up snapshot so no tick falls in between
    let room_rx = state.combats.subscribe();

    let (mut ws_sink, ws_stream) = socket.split();

    if let Some(snapshot) = state.combats.snapshot(&match_id) {
        if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::CombatStateUpdate { snapshot }).await {
            error!(match_id = %match_id, player_id = %player_id, error = %e, "Failed to send catch-up snapshot");
            return;
        }
    }

    run_session(&match_id, &player_id, &state, ws_sink, ws_stream, room_rx).await;

    info!(match_id = %match_id, player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    match_id: &str,
    player_id: &str,
    state: &AppState,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut room_rx: broadcast::Receiver<RoomMessage>,
) {
    let rate_limiter = ActionRateLimiter::new(state.config.input_rate_limit);

    // Replies meant for this connection only (pong)
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMsg>(16);

    // Spawn writer task: room messages for this match -> WebSocket
    let writer_match_id = match_id.to_string();
    let writer_player_id = player_id.to_string();
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                room = room_rx.recv() => match room {
                    Ok(room) if room.match_id == writer_match_id => room.msg,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            player_id = %writer_player_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        // Continue - don't disconnect for lag
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(player_id = %writer_player_id, "Room channel closed");
                        break;
                    }
                },
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> combat manager
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(ClientMsg::CombatAction { action }) => {
                    if !rate_limiter.check() {
                        warn!(player_id = %player_id, "Rate limited combat action");
                        continue;
                    }
                    state.combats.handle_combat_action(player_id, match_id, action);
                }
                Ok(ClientMsg::Ping { t }) => {
                    if direct_tx.send(ServerMsg::Pong { t }).await.is_err() {
                        debug!(player_id = %player_id, "Writer gone");
                        break;
                    }
                }
                Err(e) => {
                    warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(player_id = %player_id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(player_id = %player_id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
