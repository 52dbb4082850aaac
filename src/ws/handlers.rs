//! WebSocket message dispatch
//!
//! Chat lines are echoed to the room, `!game` starts a session and everything
//! else is forwarded to the running game as a guess.

use crate::game::command::strip_command_prefix;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, RoomError};
use crate::types::ChatMessage;
use std::sync::Arc;

const MAX_NAME_LEN: usize = 32;

/// Trimmed display name, or `None` if it is unusable
pub fn clean_display_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.chars().take(MAX_NAME_LEN).collect())
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    display_name: &mut String,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Join {
            display_name: requested,
        } => match clean_display_name(&requested) {
            Some(name) => {
                tracing::info!("{} is now known as {}", display_name, name);
                *display_name = name;
                Some(ServerMessage::welcome(display_name.clone()))
            }
            None => Some(ServerMessage::error(
                "INVALID_NAME",
                "Display name must not be empty",
            )),
        },

        ClientMessage::Say { text } => {
            if text.trim().is_empty() {
                return None;
            }

            let message = ChatMessage::new(display_name.clone(), text);
            state.broadcast_chat(&message);

            if let Some(args) = strip_command_prefix(&message.content) {
                return match state.start_game(args).await {
                    Ok(_) => None,
                    Err(e @ RoomError::GameRunning) => {
                        Some(ServerMessage::error("GAME_RUNNING", e.to_string()))
                    }
                };
            }

            state.route_message(message).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_display_name() {
        assert_eq!(clean_display_name("  alice "), Some("alice".to_string()));
        assert_eq!(clean_display_name("   "), None);
        assert_eq!(clean_display_name(&"x".repeat(50)).unwrap().len(), MAX_NAME_LEN);
    }
}
