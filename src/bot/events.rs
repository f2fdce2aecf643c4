use serenity::{builder::CreateMessage, http::Http, model::id::ChannelId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::player::events::PlayerEvent;
use crate::ui::embeds;

/// Consume el bus del reproductor y anuncia lo relevante por Discord.
///
/// Los eventos que ya tuvieron respuesta de interacción (pista agregada,
/// sesión creada) solo se registran en el log; anunciar esos dos por el bus
/// duplicaría mensajes.
pub async fn run_notifier(http: Arc<Http>, mut rx: broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => announce(&http, event).await,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("📡 Anunciador atrasado, {} eventos perdidos", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("📡 Anunciador terminado");
}

async fn announce(http: &Http, event: PlayerEvent) {
    match event {
        PlayerEvent::NowPlaying { channel, track, .. } => {
            send(http, channel, embeds::now_playing_embed(&track, None)).await;
        }
        PlayerEvent::NoRelated { channel, .. } => {
            send(http, channel, embeds::no_related_embed()).await;
        }
        PlayerEvent::PlaybackError {
            channel,
            track,
            error,
            ..
        } => {
            send(http, channel, embeds::playback_error_embed(&track, &error)).await;
        }
        PlayerEvent::Disconnected {
            channel, reason, ..
        } => {
            send(http, channel, embeds::disconnected_embed(reason.as_deref())).await;
        }
        PlayerEvent::SessionCreated { guild_id, .. } => {
            debug!("📡 Sesión creada en guild {}", guild_id);
        }
        PlayerEvent::ItemAdded { guild_id, count, .. } => {
            debug!("📡 {} pista(s) agregadas en guild {}", count, guild_id);
        }
        PlayerEvent::Finished { guild_id, track } => {
            debug!("📡 Terminó {} en guild {}", track.title, guild_id);
        }
        PlayerEvent::SessionDeleted { guild_id, .. } => {
            debug!("📡 Sesión eliminada en guild {}", guild_id);
        }
    }
}

async fn send(http: &Http, channel: ChannelId, embed: serenity::builder::CreateEmbed) {
    if let Err(e) = channel
        .send_message(http, CreateMessage::new().embed(embed))
        .await
    {
        error!("Error al enviar anuncio al canal {}: {:?}", channel, e);
    }
}
