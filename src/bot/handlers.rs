use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::time::Duration;
use tracing::info;

use crate::bot::TocataBot;
use crate::player::error::PlayerError;
use crate::player::filters;
use crate::player::session::SessionOptions;
use crate::player::track::RepeatMode;
use crate::sources::Resolved;
use crate::ui::embeds;

/// Despacha un comando slash hacia su handler.
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot, guild_id).await?,
        "pause" => handle_pause(ctx, command, bot, guild_id).await?,
        "resume" => handle_resume(ctx, command, bot, guild_id).await?,
        "skip" => handle_skip(ctx, command, bot, guild_id).await?,
        "previous" => handle_previous(ctx, command, bot, guild_id).await?,
        "jump" => handle_jump(ctx, command, bot, guild_id).await?,
        "seek" => handle_seek(ctx, command, bot, guild_id).await?,
        "stop" => handle_stop(ctx, command, bot, guild_id).await?,
        "leave" => handle_leave(ctx, command, bot, guild_id).await?,
        "queue" => handle_queue(ctx, command, bot, guild_id).await?,
        "nowplaying" => handle_nowplaying(ctx, command, bot, guild_id).await?,
        "shuffle" => handle_shuffle(ctx, command, bot, guild_id).await?,
        "loop" => handle_loop(ctx, command, bot, guild_id).await?,
        "autoplay" => handle_autoplay(ctx, command, bot, guild_id).await?,
        "volume" => handle_volume(ctx, command, bot, guild_id).await?,
        "filter" => handle_filter(ctx, command, bot, guild_id).await?,
        "config" => handle_config(ctx, command, bot, guild_id).await?,
        _ => {
            respond_text(ctx, &command, "❌ Comando no reconocido", true).await?;
        }
    }

    Ok(())
}

// Extracción de opciones

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn option_i64(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}

fn option_bool(command: &CommandInteraction, name: &str) -> Option<bool> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_bool())
}

fn option_channel(command: &CommandInteraction, name: &str) -> Option<ChannelId> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_channel_id())
}

// Respuestas

async fn respond_text(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_embed(
    ctx: &Context,
    command: &CommandInteraction,
    embed: serenity::builder::CreateEmbed,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;
    Ok(())
}

/// Error de una operación del reproductor, como respuesta efímera.
async fn respond_player_error(
    ctx: &Context,
    command: &CommandInteraction,
    title: &str,
    error: &PlayerError,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::error_embed(title, &error.to_string()))
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn defer(ctx: &Context, command: &CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;
    Ok(())
}

/// Canal de voz donde está el usuario, si está en alguno.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

/// Política inicial de la sesión: la configuración global con las
/// preferencias guardadas del servidor por encima.
async fn session_options(bot: &TocataBot, guild_id: GuildId) -> SessionOptions {
    let mut opts = SessionOptions {
        volume: bot.config.default_volume,
        autoplay: bot.config.enable_autoplay,
        keep_history: bot.config.keep_history,
        leave_on_stop: bot.config.leave_on_stop,
        leave_on_finish: bot.config.leave_on_finish,
        max_queue: bot.config.max_queue_size,
        max_history: bot.config.max_history,
    };
    if let Ok(settings) = bot.storage.lock().await.settings_for(guild_id.get()).await {
        opts.volume = settings.default_volume;
        opts.autoplay = settings.autoplay;
        opts.keep_history = settings.keep_history;
    }
    opts
}

/// Canal donde anunciar: el configurado para el servidor, o el del comando.
async fn announcement_channel(
    bot: &TocataBot,
    guild_id: GuildId,
    fallback: ChannelId,
) -> ChannelId {
    match bot.storage.lock().await.settings_for(guild_id.get()).await {
        Ok(settings) => settings
            .announcement_channel_id
            .map(ChannelId::new)
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}

// Handlers

async fn handle_play(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(query) = option_str(&command, "query").map(str::to_owned) else {
        return respond_text(ctx, &command, "❌ Falta la búsqueda o URL", true).await;
    };

    // Resolver puede tardar más que el plazo de la interacción; diferir.
    defer(ctx, &command).await?;

    let resolved = match bot.resolver.resolve(&query).await {
        Ok(resolved) => resolved,
        Err(e) => {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new()
                        .embed(embeds::error_embed("Sin resultados", &e.to_string())),
                )
                .await?;
            return Ok(());
        }
    };

    let playlist_title = match &resolved {
        Resolved::Playlist { title, .. } => title.clone(),
        Resolved::Track(_) => None,
    };
    let mut tracks = resolved.into_tracks();
    for track in &mut tracks {
        track.requested_by = Some(command.user.id);
    }
    let requested = tracks.len();
    let single = if requested == 1 {
        tracks.first().cloned()
    } else {
        None
    };

    let result = match bot.manager.get(guild_id) {
        Some(_) => bot.manager.enqueue(guild_id, tracks).await,
        None => {
            let Some(voice_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
                command
                    .edit_response(
                        &ctx.http,
                        EditInteractionResponse::new().embed(embeds::error_embed(
                            "Sin canal de voz",
                            "Entra a un canal de voz para reproducir música",
                        )),
                    )
                    .await?;
                return Ok(());
            };
            let opts = session_options(bot, guild_id).await;
            let text_channel = announcement_channel(bot, guild_id, command.channel_id).await;
            bot.manager
                .create(guild_id, voice_channel, text_channel, tracks, opts)
                .await
                .map(|_| requested)
        }
    };

    let embed = match result {
        Ok(added) => match single {
            Some(track) => {
                let position = bot
                    .manager
                    .get(guild_id)
                    .map(|session| {
                        let snapshot = session.snapshot();
                        snapshot.upcoming.len() + usize::from(snapshot.current.is_some())
                    })
                    .unwrap_or(1);
                embeds::track_added_embed(&track, position)
            }
            None => embeds::playlist_added_embed(
                playlist_title.as_deref(),
                added,
                requested.saturating_sub(added),
            ),
        },
        Err(e) => embeds::error_embed("No se pudo reproducir", &e.to_string()),
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

async fn handle_pause(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.pause(guild_id).await {
        Ok(()) => respond_text(ctx, &command, "⏸️ Reproducción pausada", false).await,
        Err(e) => respond_player_error(ctx, &command, "Pausa", &e).await,
    }
}

async fn handle_resume(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.resume(guild_id).await {
        Ok(()) => respond_text(ctx, &command, "▶️ Reproducción reanudada", false).await,
        Err(e) => respond_player_error(ctx, &command, "Reanudar", &e).await,
    }
}

async fn handle_skip(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    // Con autoplay el salto puede ir a buscar una continuación; diferir.
    defer(ctx, &command).await?;
    let embed = match bot.manager.skip(guild_id).await {
        Ok(()) => embeds::success_embed("Saltada", "Pasando a la siguiente canción"),
        Err(e) => embeds::error_embed("Saltar", &e.to_string()),
    };
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

async fn handle_previous(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.previous(guild_id).await {
        Ok(()) => respond_text(ctx, &command, "⏮️ Volviendo a la canción anterior", false).await,
        Err(e) => respond_player_error(ctx, &command, "Anterior", &e).await,
    }
}

async fn handle_jump(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(position) = option_i64(&command, "posicion") else {
        return respond_text(ctx, &command, "❌ Falta la posición", true).await;
    };
    match bot.manager.jump(guild_id, position).await {
        Ok(()) => {
            respond_text(
                ctx,
                &command,
                &format!("⏭️ Saltando a la posición {}", position),
                false,
            )
            .await
        }
        Err(e) => respond_player_error(ctx, &command, "Saltar a posición", &e).await,
    }
}

async fn handle_seek(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(position) = option_str(&command, "tiempo").and_then(parse_time) else {
        return respond_text(
            ctx,
            &command,
            "❌ Tiempo inválido; usa segundos (90) o minutos:segundos (1:30)",
            true,
        )
        .await;
    };
    match bot.manager.seek(guild_id, position).await {
        Ok(()) => {
            respond_text(
                ctx,
                &command,
                &format!("⏩ Saltando a {}", format_position(position)),
                false,
            )
            .await
        }
        Err(e) => respond_player_error(ctx, &command, "Búsqueda", &e).await,
    }
}

async fn handle_stop(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.stop(guild_id).await {
        Ok(()) => respond_text(ctx, &command, "⏹️ Reproducción detenida", false).await,
        Err(e) => respond_player_error(ctx, &command, "Detener", &e).await,
    }
}

async fn handle_leave(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.leave(guild_id).await {
        Ok(()) => respond_text(ctx, &command, "👋 Hasta la próxima", false).await,
        Err(e) => respond_player_error(ctx, &command, "Salir", &e).await,
    }
}

async fn handle_queue(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.manager.get(guild_id) else {
        return respond_text(ctx, &command, "😴 No hay una sesión activa", true).await;
    };
    let elapsed = session.elapsed().await;
    let snapshot = session.snapshot();
    respond_embed(ctx, &command, embeds::queue_embed(&snapshot, Some(elapsed))).await
}

async fn handle_nowplaying(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.manager.get(guild_id) else {
        return respond_text(ctx, &command, "😴 No hay una sesión activa", true).await;
    };
    let elapsed = session.elapsed().await;
    match session.snapshot().current {
        Some(track) => {
            respond_embed(
                ctx,
                &command,
                embeds::now_playing_embed(&track, Some(elapsed)),
            )
            .await
        }
        None => respond_text(ctx, &command, "❌ No hay nada reproduciéndose", true).await,
    }
}

async fn handle_shuffle(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.shuffle(guild_id).await {
        Ok(upcoming) => {
            respond_text(
                ctx,
                &command,
                &format!("🔀 {} canciones barajadas", upcoming),
                false,
            )
            .await
        }
        Err(e) => respond_player_error(ctx, &command, "Barajar", &e).await,
    }
}

async fn handle_loop(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let mode = match option_str(&command, "modo") {
        Some("off") => Some(RepeatMode::Off),
        Some("track") => Some(RepeatMode::Track),
        Some("queue") => Some(RepeatMode::Queue),
        _ => None,
    };
    match bot.manager.set_repeat(guild_id, mode).await {
        Ok(new_mode) => {
            respond_text(
                ctx,
                &command,
                &format!("🔄 Repetición: {}", new_mode.label()),
                false,
            )
            .await
        }
        Err(e) => respond_player_error(ctx, &command, "Repetición", &e).await,
    }
}

async fn handle_autoplay(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    match bot.manager.toggle_autoplay(guild_id).await {
        Ok(true) => respond_text(ctx, &command, "📻 Autoplay activado", false).await,
        Ok(false) => respond_text(ctx, &command, "📻 Autoplay desactivado", false).await,
        Err(e) => respond_player_error(ctx, &command, "Autoplay", &e).await,
    }
}

async fn handle_volume(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(level) = option_i64(&command, "nivel") else {
        // Sin argumento, mostrar el volumen actual.
        return match bot.manager.get(guild_id) {
            Some(session) => {
                respond_text(
                    ctx,
                    &command,
                    &format!("🔊 Volumen actual: {:.0}%", session.volume() * 100.0),
                    true,
                )
                .await
            }
            None => respond_text(ctx, &command, "😴 No hay una sesión activa", true).await,
        };
    };
    let volume = level as f32 / 100.0;
    match bot.manager.set_volume(guild_id, volume).await {
        Ok(()) => respond_text(ctx, &command, &format!("🔊 Volumen al {}%", level), false).await,
        Err(e) => respond_player_error(ctx, &command, "Volumen", &e).await,
    }
}

async fn handle_filter(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    // Cambiar filtros reinicia la pista en su posición; diferir.
    defer(ctx, &command).await?;

    let embed = if let Some(name) = option_str(&command, "quitar").map(str::to_owned) {
        match bot.manager.remove_filter(guild_id, &name).await {
            Ok(()) => embeds::success_embed("Filtro quitado", &format!("**{}** desactivado", name)),
            Err(e) => embeds::error_embed("Filtros", &e.to_string()),
        }
    } else {
        match option_str(&command, "preset").map(str::to_owned) {
            Some(name) if name == "none" => match bot.manager.clear_filters(guild_id).await {
                Ok(true) => embeds::success_embed("Filtros", "Todos los filtros desactivados"),
                Ok(false) => embeds::info_embed("Filtros", "No había filtros activos"),
                Err(e) => embeds::error_embed("Filtros", &e.to_string()),
            },
            Some(name) => match filters::preset(&name) {
                Some(spec) => match bot.manager.add_filter(guild_id, &name, spec).await {
                    Ok(()) => {
                        embeds::success_embed("Filtro activado", &format!("**{}** aplicado", name))
                    }
                    Err(e) => embeds::error_embed("Filtros", &e.to_string()),
                },
                None => embeds::error_embed("Filtros", &format!("Preset desconocido: {}", name)),
            },
            None => match bot.manager.get(guild_id) {
                Some(session) => {
                    let active = session.snapshot().filters;
                    if active.is_empty() {
                        embeds::info_embed("Filtros", "No hay filtros activos")
                    } else {
                        embeds::info_embed("Filtros activos", &active.join(", "))
                    }
                }
                None => embeds::info_embed("Filtros", "No hay una sesión activa"),
            },
        }
    };

    command
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

async fn handle_config(
    ctx: &Context,
    command: CommandInteraction,
    bot: &TocataBot,
    guild_id: GuildId,
) -> Result<()> {
    let volume = option_i64(&command, "volumen");
    let autoplay = option_bool(&command, "autoplay");
    let history = option_bool(&command, "historial");
    let announcements = option_channel(&command, "anuncios");

    let mut storage = bot.storage.lock().await;

    if volume.is_none() && autoplay.is_none() && history.is_none() && announcements.is_none() {
        let settings = storage.settings_for(guild_id.get()).await?;
        drop(storage);
        let description = format!(
            "🔊 Volumen por defecto: {:.0}%\n📻 Autoplay: {}\n🕘 Historial: {}\n📣 Anuncios: {}",
            settings.default_volume * 100.0,
            if settings.autoplay { "sí" } else { "no" },
            if settings.keep_history { "sí" } else { "no" },
            settings
                .announcement_channel_id
                .map(|id| format!("<#{}>", id))
                .unwrap_or_else(|| "canal del comando".to_string()),
        );
        return respond_embed(
            ctx,
            &command,
            embeds::info_embed("Preferencias del servidor", &description),
        )
        .await;
    }

    if let Some(level) = volume {
        storage
            .set_default_volume(guild_id.get(), level as f32 / 100.0)
            .await?;
    }
    if let Some(enabled) = autoplay {
        storage.set_autoplay(guild_id.get(), enabled).await?;
    }
    if let Some(enabled) = history {
        storage.set_keep_history(guild_id.get(), enabled).await?;
    }
    if let Some(channel) = announcements {
        storage
            .set_announcement_channel(guild_id.get(), Some(channel.get()))
            .await?;
    }
    drop(storage);

    respond_embed(
        ctx,
        &command,
        embeds::success_embed(
            "Preferencias guardadas",
            "Los cambios aplican a las próximas sesiones",
        ),
    )
    .await
}

/// Interpreta "90", "1:30" o "1:02:03" como una posición de reproducción.
fn parse_time(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let mut total: u64 = 0;
    for segment in input.split(':') {
        let value: u64 = segment.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    Some(Duration::from_secs(total))
}

fn format_position(position: Duration) -> String {
    let secs = position.as_secs();
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_time_accepts_all_formats() {
        assert_eq!(parse_time("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_time("1:30"), Some(Duration::from_secs(90)));
        assert_eq!(parse_time("1:02:03"), Some(Duration::from_secs(3723)));
        assert_eq!(parse_time(" 0:45 "), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("abc"), None);
        assert_eq!(parse_time("1:xx"), None);
        assert_eq!(parse_time("-5"), None);
    }

    #[test]
    fn test_format_position_rolls_over_hours() {
        assert_eq!(format_position(Duration::from_secs(90)), "1:30");
        assert_eq!(format_position(Duration::from_secs(3723)), "1:02:03");
    }
}
