use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::game::Presenter;
use crate::protocol::ServerMessage;
use crate::types::Embed;

/// Presenter that posts game output to every client in the room
#[derive(Clone)]
pub struct BroadcastPresenter {
    room: broadcast::Sender<ServerMessage>,
}

impl BroadcastPresenter {
    pub fn new(room: broadcast::Sender<ServerMessage>) -> Self {
        Self { room }
    }
}

#[async_trait]
impl Presenter for BroadcastPresenter {
    async fn publish(&self, embed: Embed) {
        tracing::debug!("Publishing embed: {}", embed.title);
        // Ignore send errors (no receivers connected is fine)
        let _ = self.room.send(ServerMessage::Embed(embed));
    }
}
