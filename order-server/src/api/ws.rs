//! WebSocket endpoints: 实时订单事件推送
//!
//! - `GET /ws/tenant/{tenant_id}?token=<JWT>`: staff dashboards, every event of the tenant
//! - `GET /ws/table/{table_token}?session=<token>`: customer devices, events of one table
//!   (narrowed to one session when `session` is given)
//!
//! Auth: credentials travel in the query string (browser WebSocket 不支持自定义 headers).
//! Rejected credentials still upgrade, then close with 1008 so clients can tell
//! "do not reconnect" apart from a network failure.
//!
//! No replay: a subscriber that lagged behind gets a `resync` message and is
//! expected to re-fetch state over HTTP.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::Duration;

use crate::core::ServerState;
use crate::message::{CLOSE_AUTH_REJECTED, CLOSE_NORMAL, ChannelMessage, HubEvent};

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/ws/tenant/{tenant_id}", get(handle_staff_ws))
        .route("/ws/table/{table_token}", get(handle_table_ws))
}

#[derive(Deserialize)]
pub struct StaffWsQuery {
    token: Option<String>,
}

#[derive(Deserialize)]
pub struct TableWsQuery {
    session: Option<String>,
}

/// Which events a connection receives
#[derive(Debug, Clone)]
enum Audience {
    Tenant,
    Table {
        table_id: i64,
        session: Option<String>,
    },
}

impl Audience {
    fn wants(&self, event: &HubEvent) -> bool {
        match self {
            Audience::Tenant => true,
            Audience::Table { table_id, session } => {
                event.visible_to_table(*table_id, session.as_deref())
            }
        }
    }
}

/// GET /ws/tenant/{tenant_id}?token=<JWT>
pub async fn handle_staff_ws(
    State(state): State<ServerState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<StaffWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let authorized = match query.token.as_deref() {
        Some(token) => match state.jwt_service.validate_token(token) {
            Ok(claims) if claims.tenant_id == tenant_id => true,
            Ok(claims) => {
                tracing::warn!(target: "security", tenant_id = %tenant_id, token_tenant = %claims.tenant_id, "Staff WS tenant mismatch");
                false
            }
            Err(e) => {
                tracing::debug!("Staff WS JWT validation failed: {e}");
                false
            }
        },
        None => false,
    };

    ws.on_upgrade(move |socket| async move {
        if authorized {
            ws_session(socket, state, tenant_id, Audience::Tenant).await;
        } else {
            reject(socket, "invalid or missing token").await;
        }
    })
}

/// GET /ws/table/{table_token}?session=<token>
pub async fn handle_table_ws(
    State(state): State<ServerState>,
    Path(table_token): Path<String>,
    Query(query): Query<TableWsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let table = state.tables.resolve_token(&table_token);
    let session = query.session.filter(|s| !s.trim().is_empty());

    ws.on_upgrade(move |socket| async move {
        match table {
            Some(table) => {
                let audience = Audience::Table {
                    table_id: table.table_id,
                    session,
                };
                ws_session(socket, state, table.tenant_id, audience).await;
            }
            None => reject(socket, "unknown table").await,
        }
    })
}

async fn reject(mut socket: WebSocket, reason: &'static str) {
    let frame = CloseFrame {
        code: CLOSE_AUTH_REJECTED,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn send_message(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ChannelMessage,
) -> Result<(), ()> {
    let json = msg.to_json().map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize channel message");
    })?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

async fn ws_session(socket: WebSocket, state: ServerState, tenant_id: String, audience: Audience) {
    let (mut sink, mut stream) = socket.split();
    let hub = state.manager.hub().clone();
    let mut hub_rx = hub.subscribe(&tenant_id);

    tracing::info!(tenant_id = %tenant_id, audience = ?audience, "WS connected");

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                let frame = CloseFrame {
                    code: CLOSE_NORMAL,
                    reason: "server shutting down".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }

            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = hub_rx.recv() => {
                match event {
                    Ok(hub_event) => {
                        if audience.wants(&hub_event)
                            && send_message(&mut sink, &hub_event.message).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(tenant_id = %tenant_id, lagged = n, "WS subscriber lagged, requesting resync");
                        // 重新订阅以获取从当前位置开始的新 receiver
                        hub_rx = hub.subscribe(&tenant_id);
                        if send_message(&mut sink, &ChannelMessage::resync()).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Subscribers have nothing to say; pings are answered by axum
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    drop(hub_rx);
    hub.release(&tenant_id);
    tracing::info!(tenant_id = %tenant_id, "WS disconnected");
}
