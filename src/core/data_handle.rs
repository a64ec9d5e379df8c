use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::format::StreamFrame;
use crate::core::stream::Subscription;

#[derive(Serialize)]
struct FramePayload<'a> {
    #[serde(flatten)]
    frame: &'a StreamFrame,
    end_flag: bool,
}

enum Event {
    Frame(Option<Arc<StreamFrame>>),
    Incoming(Option<Result<Message, axum::Error>>),
}

#[derive(Serialize)]
struct EndPayload {
    end_flag: bool,
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, payload: &T) -> bool {
    let json = match serde_json::to_string(payload) {
        Ok(j) => j,
        Err(e) => {
            error!("json serialize error: {}", e);
            return false;
        }
    };

    if let Err(e) = socket.send(Message::Text(json.into())).await {
        warn!("ws send failed: {}", e);
        return false;
    }
    true
}

async fn send_frame(socket: &mut WebSocket, frame: &Arc<StreamFrame>) -> bool {
    send_json(
        socket,
        &FramePayload {
            frame,
            end_flag: false,
        },
    )
    .await
}

/// Pushes the current frame, then every new one, until the stream is torn
/// down or the peer goes away.
pub async fn handle_ws_stream(mut socket: WebSocket, mut subscription: Subscription) {
    info!("ws stream started");

    let current = subscription.current();
    if !send_frame(&mut socket, &current).await {
        return;
    }

    loop {
        let event = tokio::select! {
            frame = subscription.next() => Event::Frame(frame),
            incoming = socket.recv() => Event::Incoming(incoming),
        };

        match event {
            Event::Frame(Some(frame)) => {
                if !send_frame(&mut socket, &frame).await {
                    return;
                }
            }
            Event::Frame(None) => break,
            Event::Incoming(Some(Ok(Message::Close(_)))) | Event::Incoming(None) => {
                info!("ws peer closed");
                return;
            }
            Event::Incoming(Some(Err(e))) => {
                warn!("ws receive failed: {}", e);
                return;
            }
            Event::Incoming(Some(Ok(_))) => {}
        }
    }

    // 🔚 END FLAG
    send_json(&mut socket, &EndPayload { end_flag: true }).await;

    info!("ws stream finished");
}
