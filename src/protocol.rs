use crate::types::{ChatMessage, Embed};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Change the display name of this connection
    Join { display_name: String },
    /// Post a chat line (guesses and `!game` commands included)
    Say { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        display_name: String,
        server_now: String,
    },
    /// A chat line echoed to the whole room
    Chat {
        author: String,
        text: String,
        ts: String,
    },
    /// Bot output
    Embed(Embed),
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn welcome(display_name: impl Into<String>) -> Self {
        ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            display_name: display_name.into(),
            server_now: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn chat(message: &ChatMessage) -> Self {
        ServerMessage::Chat {
            author: message.author.clone(),
            text: message.content.clone(),
            ts: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage = serde_json::from_str(r#"{"t":"say","text":"!game rock"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Say { text } if text == "!game rock"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"join","display_name":"alice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Join { display_name } if display_name == "alice"));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"vote"}"#).is_err());
    }

    #[test]
    fn test_embed_serialization() {
        let msg = ServerMessage::Embed(Embed::new("Round 1", "The round will start shortly."));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "embed");
        assert_eq!(json["title"], "Round 1");
        assert!(json.get("field").is_none());

        let msg = ServerMessage::Embed(Embed::new("Round over", "").with_field("Points table", "1. a: 2"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["field"]["name"], "Points table");
        assert_eq!(json["field"]["value"], "1. a: 2");
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&ServerMessage::error("GAME_RUNNING", "busy")).unwrap();
        assert_eq!(json, r#"{"t":"error","code":"GAME_RUNNING","msg":"busy"}"#);
    }
}
