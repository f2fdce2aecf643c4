use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, channel::ChannelType, id::GuildId},
    prelude::Context,
};

use crate::player::filters;

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        play_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        previous_command(),
        jump_command(),
        seek_command(),
        stop_command(),
        leave_command(),
        queue_command(),
        nowplaying_command(),
        shuffle_command(),
        loop_command(),
        autoplay_command(),
        volume_command(),
        filter_command(),
        config_command(),
    ]
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción o playlist")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta a la siguiente canción")
}

fn previous_command() -> CreateCommand {
    CreateCommand::new("previous").description("Vuelve a la canción anterior")
}

fn jump_command() -> CreateCommand {
    CreateCommand::new("jump")
        .description("Salta a una posición de la cola")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "posicion",
                "2 salta a la segunda de la cola; -1 vuelve una hacia atrás",
            )
            .required(true),
        )
}

fn seek_command() -> CreateCommand {
    CreateCommand::new("seek")
        .description("Salta a un punto de la canción actual")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "tiempo",
                "Posición destino, ej: 90 o 1:30",
            )
            .required(true),
        )
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la reproducción y cierra la sesión")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Desconecta el bot del canal de voz")
}

// Comandos de cola

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Muestra la cola de reproducción")
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra información de la canción actual")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Baraja las canciones en espera")
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop")
        .description("Configura el modo de repetición")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "modo",
                "Sin modo avanza el ciclo; repetir el activo lo apaga",
            )
            .add_string_choice("Desactivar", "off")
            .add_string_choice("Canción", "track")
            .add_string_choice("Cola", "queue"),
        )
}

fn autoplay_command() -> CreateCommand {
    CreateCommand::new("autoplay").description("Activa/desactiva la continuación automática")
}

// Comandos de audio

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Ajusta el volumen de reproducción")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "nivel",
                "Nivel de volumen (0-200)",
            )
            .min_int_value(0)
            .max_int_value(200),
        )
}

fn filter_command() -> CreateCommand {
    let mut preset_option = CreateCommandOption::new(
        CommandOptionType::String,
        "preset",
        "Efecto a activar, o Ninguno para limpiar",
    );
    for name in filters::preset_names() {
        preset_option = preset_option.add_string_choice(name, name);
    }
    preset_option = preset_option.add_string_choice("Ninguno", "none");

    CreateCommand::new("filter")
        .description("Gestiona los filtros de audio")
        .add_option(preset_option)
        .add_option(CreateCommandOption::new(
            CommandOptionType::String,
            "quitar",
            "Nombre del filtro a quitar",
        ))
}

// Preferencias del servidor

fn config_command() -> CreateCommand {
    CreateCommand::new("config")
        .description("Consulta o cambia las preferencias del servidor")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "volumen",
                "Volumen por defecto de nuevas sesiones (0-200)",
            )
            .min_int_value(0)
            .max_int_value(200),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "autoplay",
            "Continuación automática por defecto",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::Boolean,
            "historial",
            "Conservar las canciones ya reproducidas",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Channel,
                "anuncios",
                "Canal donde anunciar lo que suena",
            )
            .channel_types(vec![ChannelType::Text]),
        )
}
