//! WebSocket upgrade and per-connection socket loop: one upgrade route, inbound
//! events dispatched through the same engine operations as REST, outbound
//! delivery via an mpsc forwarder.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::engine::{ParticipantId, Pin, ServerEvent, SocketId};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
enum InboundEvent {
    CreateRoom { pin: String, participant_id: String },
    JoinRoom { pin: String, participant_id: String },
    Message { pin: String, text: String },
    StartGame { pin: String },
    Answer { pin: String, option_index: u8 },
    LeaveRoom { pin: String },
}

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let sid: SocketId = uuid::Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    // Bound lazily: this socket only joins the dispatcher's membership index once it
    // receives a `create_room`/`join_room` event naming the (pin, participantId) it
    // belongs to, which the client already obtained via the REST flow.
    let mut outbound: Option<tokio::sync::mpsc::Receiver<std::sync::Arc<ServerEvent>>> = None;
    let mut bound_pin: Option<Pin> = None;

    loop {
        tokio::select! {
            inbound = stream.next() => {
                let Some(inbound) = inbound else { break };
                match inbound {
                    Ok(Message::Text(text)) => {
                        if let Some((pin, rx)) = handle_inbound(&state, sid, &mut bound_pin, &text, &mut sink).await {
                            outbound = Some(rx);
                            bound_pin = Some(pin);
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        debug!(socket = %sid, error = %err, "websocket read error");
                        break;
                    }
                }
            }
            event = recv_outbound(&mut outbound) => {
                let Some(event) = event else {
                    // Dispatcher dropped our sender (e.g. we were superseded by a
                    // rebind). Stop forwarding; the socket stays open for inbound.
                    outbound = None;
                    continue;
                };
                let payload = match serde_json::to_string(&*event) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize outbound event");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some((pin, _participant_id, _snapshot)) = state.service.unbind_socket(sid).await {
        debug!(socket = %sid, pin = %pin, "socket disconnected, treated as leave");
    }
}

async fn recv_outbound(
    outbound: &mut Option<tokio::sync::mpsc::Receiver<std::sync::Arc<ServerEvent>>>,
) -> Option<std::sync::Arc<ServerEvent>> {
    match outbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Handles one inbound frame. Returns `Some((pin, receiver))` the first time this
/// socket binds to a room, so the caller can start forwarding its outbound channel.
async fn handle_inbound(
    state: &AppState,
    sid: SocketId,
    bound_pin: &mut Option<Pin>,
    text: &str,
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) -> Option<(Pin, tokio::sync::mpsc::Receiver<std::sync::Arc<ServerEvent>>)> {
    let event: InboundEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            send_error(sink, &format!("malformed message: {err}")).await;
            return None;
        }
    };

    match event {
        InboundEvent::CreateRoom { pin, participant_id } => {
            let pin = Pin::normalize(&pin);
            let participant_id = ParticipantId::from_raw(participant_id);
            let rx = state.service.bind_socket(&pin, &participant_id, sid).await;
            if let Ok(room) = state.service.get_room(&pin).await {
                send_direct(sink, ServerEvent::RoomCreated(room)).await;
            }
            return Some((pin, rx));
        }
        InboundEvent::JoinRoom { pin, participant_id } => {
            let pin = Pin::normalize(&pin);
            let participant_id = ParticipantId::from_raw(participant_id);
            let rx = state.service.bind_socket(&pin, &participant_id, sid).await;
            if let Ok(room) = state.service.get_room(&pin).await {
                send_direct(sink, ServerEvent::RoomJoined(room)).await;
            }
            return Some((pin, rx));
        }
        InboundEvent::Message { pin, text } => {
            let Some(participant_id) = bound_participant(state, sid).await else {
                send_error(sink, "socket is not bound to a room").await;
                return None;
            };
            let pin = Pin::normalize(&pin);
            if let Err(err) = state.service.add_message(&pin, &participant_id, text).await {
                send_error(sink, &err.to_string()).await;
            }
        }
        InboundEvent::StartGame { pin } => {
            let Some(participant_id) = bound_participant(state, sid).await else {
                send_error(sink, "socket is not bound to a room").await;
                return None;
            };
            let pin = Pin::normalize(&pin);
            if let Err(err) = state.service.start_game(&pin, &participant_id).await {
                send_error(sink, &err.to_string()).await;
            }
        }
        InboundEvent::Answer { pin, option_index } => {
            let Some(participant_id) = bound_participant(state, sid).await else {
                send_error(sink, "socket is not bound to a room").await;
                return None;
            };
            let pin = Pin::normalize(&pin);
            if let Err(err) = state.service.submit_answer(&pin, &participant_id, option_index).await {
                send_error(sink, &err.to_string()).await;
            }
        }
        InboundEvent::LeaveRoom { pin } => {
            let Some(participant_id) = bound_participant(state, sid).await else {
                send_error(sink, "socket is not bound to a room").await;
                return None;
            };
            let pin = Pin::normalize(&pin);
            if let Err(err) = state.service.leave_room(&pin, &participant_id).await {
                send_error(sink, &err.to_string()).await;
            }
            *bound_pin = None;
        }
    }
    None
}

async fn bound_participant(state: &AppState, sid: SocketId) -> Option<ParticipantId> {
    state
        .service
        .registry
        .get_bound(&sid)
        .await
        .map(|(_, participant_id)| participant_id)
}

async fn send_error(sink: &mut futures_util::stream::SplitSink<WebSocket, Message>, detail: &str) {
    send_direct(sink, ServerEvent::Error { detail: detail.to_owned() }).await;
}

async fn send_direct(sink: &mut futures_util::stream::SplitSink<WebSocket, Message>, event: ServerEvent) {
    if let Ok(payload) = serde_json::to_string(&event) {
        let _ = sink.send(Message::Text(payload.into())).await;
    }
}
