use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::broadcast;
use tracing::debug;

/// Señales de ciclo de vida que el reproductor publica hacia la capa de
/// presentación. Llevan identidades y datos, nunca lógica de render.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    SessionCreated {
        guild_id: GuildId,
        voice_channel: ChannelId,
    },
    ItemAdded {
        guild_id: GuildId,
        channel: ChannelId,
        track: crate::player::track::Track,
        count: usize,
    },
    NowPlaying {
        guild_id: GuildId,
        channel: ChannelId,
        track: crate::player::track::Track,
    },
    Finished {
        guild_id: GuildId,
        track: crate::player::track::Track,
    },
    SessionDeleted {
        guild_id: GuildId,
        channel: ChannelId,
    },
    Disconnected {
        guild_id: GuildId,
        channel: ChannelId,
        reason: Option<String>,
    },
    NoRelated {
        guild_id: GuildId,
        channel: ChannelId,
    },
    PlaybackError {
        guild_id: GuildId,
        channel: ChannelId,
        track: crate::player::track::Track,
        error: String,
    },
}

/// Bus de eventos multi-consumidor sobre un canal broadcast de tokio.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Publica sin bloquear; si no hay suscriptores el evento se pierde.
    pub fn emit(&self, event: PlayerEvent) {
        if self.sender.send(event).is_err() {
            debug!("📡 Evento emitido sin suscriptores");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::track::Track;

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(PlayerEvent::NowPlaying {
            guild_id: GuildId::new(1),
            channel: ChannelId::new(2),
            track: Track::new("id1", "Canción", "https://example.com/1"),
        });

        match rx.recv().await {
            Ok(PlayerEvent::NowPlaying { guild_id, track, .. }) => {
                assert_eq!(guild_id, GuildId::new(1));
                assert_eq!(track.id, "id1");
            }
            other => panic!("evento inesperado: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.emit(PlayerEvent::NoRelated {
            guild_id: GuildId::new(1),
            channel: ChannelId::new(2),
        });
    }
}
