use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use derelict_common::codec::encode_server_message;
use derelict_common::protocol::ServerMessage;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, warn};
use warp::Filter;
use warp::ws::{Message, WebSocket, Ws};

use crate::ClientId;
use crate::leaderboard::{DEFAULT_LIMIT, LeaderboardStore};
use crate::room_manager::Outbox;

/// Connection events forwarded to the game task.
#[derive(Debug)]
pub enum Inbound {
    Connected {
        client_id: ClientId,
        sender: UnboundedSender<Message>,
    },
    Frame {
        client_id: ClientId,
        text: String,
    },
    Disconnected {
        client_id: ClientId,
    },
}

/// Outbox backed by the per-connection writer channels.
#[derive(Default)]
pub struct ChannelOutbox {
    senders: HashMap<ClientId, UnboundedSender<Message>>,
}

impl ChannelOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client_id: ClientId, sender: UnboundedSender<Message>) {
        self.senders.insert(client_id, sender);
    }

    pub fn unregister(&mut self, client_id: ClientId) {
        self.senders.remove(&client_id);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    fn deliver(&self, client_id: ClientId, payload: &str) {
        let Some(sender) = self.senders.get(&client_id) else {
            return;
        };
        if sender.send(Message::text(payload)).is_err() {
            warn!(%client_id, "outbound channel closed");
        }
    }
}

impl Outbox for ChannelOutbox {
    fn send(&mut self, client_id: ClientId, message: &ServerMessage) {
        match encode_server_message(message) {
            Ok(payload) => self.deliver(client_id, &payload),
            Err(err) => error!(%client_id, error = %err, "failed to encode message"),
        }
    }

    // Encode once, send the same text to many.
    fn broadcast(&mut self, client_ids: &[ClientId], message: &ServerMessage) {
        match encode_server_message(message) {
            Ok(payload) => {
                for client_id in client_ids {
                    self.deliver(*client_id, &payload);
                }
            }
            Err(err) => error!(error = %err, "failed to encode broadcast"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn with<T: Clone + Send + Sync>(value: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// `GET /api/leaderboard?limit=N`.
pub fn leaderboard_route(
    leaderboard: Arc<dyn LeaderboardStore>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path!("api" / "leaderboard")
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(with(leaderboard))
        .map(|query: LeaderboardQuery, leaderboard: Arc<dyn LeaderboardStore>| {
            let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
            warp::reply::json(&leaderboard.top(limit))
        })
}

/// Every HTTP and websocket route the server exposes.
pub fn routes(
    inbound: UnboundedSender<Inbound>,
    leaderboard: Arc<dyn LeaderboardStore>,
    static_dir: PathBuf,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let socket = warp::path::end()
        .or(warp::path!("ws"))
        .unify()
        .and(warp::ws())
        .and(with(inbound))
        .map(|ws: Ws, inbound: UnboundedSender<Inbound>| {
            ws.on_upgrade(move |socket| handle_socket(socket, inbound))
        });

    let landing = warp::path::end()
        .and(warp::get())
        .and(warp::fs::file(static_dir.join("landing.html")));
    let play = warp::path!("play")
        .and(warp::get())
        .and(warp::fs::file(static_dir.join("index.html")));
    let assets = warp::fs::dir(static_dir);

    socket
        .or(leaderboard_route(leaderboard))
        .or(landing)
        .or(play)
        .or(assets)
}

async fn handle_socket(socket: WebSocket, inbound: UnboundedSender<Inbound>) {
    let client_id = ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed));
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(err) = ws_tx.send(message).await {
                debug!(%client_id, error = %err, "websocket send failed");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    if inbound.send(Inbound::Connected { client_id, sender: tx }).is_err() {
        warn!(%client_id, "game task is gone, dropping connection");
        return;
    }

    while let Some(result) = ws_rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                debug!(%client_id, error = %err, "websocket read failed");
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };
        let frame = Inbound::Frame {
            client_id,
            text: text.to_owned(),
        };
        if inbound.send(frame).is_err() {
            break;
        }
    }

    let _ = inbound.send(Inbound::Disconnected { client_id });
}
