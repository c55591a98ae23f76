//! One WebSocket connection = one participant.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use imitation_application::Arena;
use imitation_core::protocol::{ClientEvent, ServerEvent};

/// Parses one text frame into a client event.
pub fn parse_frame(text: &str) -> Result<ClientEvent, String> {
    serde_json::from_str(text).map_err(|err| format!("Invalid message: {}", err))
}

/// Runs a participant until the socket closes.
pub async fn serve_participant(arena: Arena, participant_id: String, socket: WebSocket) {
    let mut events = match arena.connect(&participant_id) {
        Ok(rx) => rx,
        Err(err) => {
            tracing::warn!(participant_id = %participant_id, error = %err, "Refusing connection");
            return;
        }
    };
    let (mut sink, mut stream) = socket.split();

    let writer_id = participant_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(participant_id = %writer_id, error = %err, "Failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match parse_frame(&text) {
                Ok(event) => arena.handle(&participant_id, event).await,
                Err(message) => {
                    tracing::debug!(participant_id = %participant_id, "Unparseable frame");
                    arena.hub().send(&participant_id, ServerEvent::error(message));
                }
            },
            Message::Binary(_) => {
                arena.hub().send(
                    &participant_id,
                    ServerEvent::error("Binary frames are not supported"),
                );
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    arena.disconnect(&participant_id).await;
    writer.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_frames() {
        assert_eq!(
            parse_frame(r#"{"type":"JOIN_MATCHMAKING"}"#).unwrap(),
            ClientEvent::JoinMatchmaking
        );
        assert_eq!(
            parse_frame(r#"{"type":"SEND_MESSAGE","text":"hi"}"#).unwrap(),
            ClientEvent::SendMessage {
                text: "hi".to_string()
            }
        );
        assert_eq!(
            parse_frame(r#"{"type":"RETIRE"}"#).unwrap(),
            ClientEvent::Retire { timeout: None }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_frame(r#"{"type":"DANCE"}"#).unwrap_err();
        assert!(err.starts_with("Invalid message"));
        assert!(parse_frame("not json").is_err());
    }
}
