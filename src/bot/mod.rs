//! Capa de Discord: registro de comandos, despacho de interacciones y el
//! anunciador que convierte los eventos del reproductor en mensajes.
//!
//! Todo lo que pasa aquí es pegamento: las interacciones se traducen en
//! llamadas al [`SessionManager`] y las señales del bus en embeds. Ninguna
//! decisión de reproducción vive en este módulo.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod events;
pub mod handlers;

use crate::config::Config;
use crate::player::SessionManager;
use crate::sources::TrackResolver;
use crate::storage::JsonStorage;

/// Handler principal del bot.
///
/// Implementa el [`EventHandler`] de serenity y reparte cada interacción
/// hacia el manejador de sesiones. El estado compartido viaja en `Arc`; el
/// almacenamiento usa un mutex de tokio porque sus operaciones son async.
pub struct TocataBot {
    pub config: Arc<Config>,
    pub storage: Arc<tokio::sync::Mutex<JsonStorage>>,
    pub manager: Arc<SessionManager>,
    pub resolver: Arc<dyn TrackResolver>,
}

impl TocataBot {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<tokio::sync::Mutex<JsonStorage>>,
        manager: Arc<SessionManager>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Self {
        Self {
            config,
            storage,
            manager,
            resolver,
        }
    }

    /// Registra los comandos slash, globales o por guild según configuración.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::from(guild_id);
                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos registrados para guild {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for TocataBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Sigue los movimientos del propio bot entre canales de voz.
    ///
    /// La pérdida de conexión la observa el driver directamente; aquí solo
    /// se anota el canal nuevo tras un traslado, para que los reintentos de
    /// reconexión apunten al lugar correcto.
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }
        if let (Some(guild_id), Some(channel_id)) = (new.guild_id, new.channel_id) {
            self.manager.note_moved(guild_id, channel_id);
        }
    }
}
