use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::player::{track::RepeatMode, session::SessionSnapshot, Track};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎶 Tocata";

/// Crea un embed para mostrar la canción actual
pub fn now_playing_embed(track: &Track, elapsed: Option<Duration>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", track.title))
        .color(colors::SUCCESS_GREEN)
        .field(
            "🎤 Artista",
            track.artist.clone().unwrap_or_else(|| "Desconocido".to_string()),
            true,
        );

    if track.live {
        embed = embed.field("⏱️ Duración", "🔴 En vivo", true);
    } else if let Some(duration) = track.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    }

    if let Some(user_id) = track.requested_by {
        embed = embed.field("👤 Solicitado por", format!("<@{}>", user_id), true);
    }

    if let (Some(position), Some(duration)) = (elapsed, track.duration) {
        if !track.live {
            embed = embed.field(
                "📊 Progreso",
                format!(
                    "{} `{} / {}`",
                    progress_bar(position, duration),
                    format_duration(position),
                    format_duration(duration)
                ),
                false,
            );
        }
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que se agregó una canción
pub fn track_added_embed(track: &Track, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Canción Agregada")
        .description(format!("**{}** se ha agregado a la cola", track.title))
        .color(colors::SUCCESS_GREEN)
        .field("📊 Posición", position.to_string(), true);

    if track.live {
        embed = embed.field("⏱️ Duración", "🔴 En vivo", true);
    } else if let Some(duration) = track.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que una playlist fue agregada
pub fn playlist_added_embed(title: Option<&str>, added: usize, skipped: usize) -> CreateEmbed {
    let description = match title {
        Some(name) => format!("Se agregaron **{} canciones** de **{}**", added, name),
        None => format!("Se agregaron **{} canciones** de la playlist", added),
    };

    let mut embed = CreateEmbed::default()
        .title("📋 Playlist Agregada")
        .description(description)
        .color(colors::MUSIC_PURPLE)
        .field("📊 Canciones agregadas", added.to_string(), true);

    if skipped > 0 {
        embed = embed.field("✂️ Omitidas por límite", skipped.to_string(), true);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "🎵 Usa /queue para ver todas las canciones",
        ))
}

/// Crea un embed para mostrar la cola de reproducción
pub fn queue_embed(snapshot: &SessionSnapshot, elapsed: Option<Duration>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if snapshot.current.is_none() && snapshot.upcoming.is_empty() {
        return embed
            .description("😴 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    if let Some(current) = &snapshot.current {
        let status = match snapshot.repeat {
            RepeatMode::Track => "🔂",
            RepeatMode::Queue => "🔁",
            RepeatMode::Off => "▶️",
        };

        let mut line = format!("**{}**", current.title);
        if let Some(artist) = &current.artist {
            line.push_str(&format!(" - {}", artist));
        }
        if let (Some(position), Some(duration)) = (elapsed, current.duration) {
            line.push_str(&format!(
                " `[{} / {}]`",
                format_duration(position),
                format_duration(duration)
            ));
        }

        embed = embed.field(format!("{} Reproduciendo", status), line, false);
    }

    if !snapshot.upcoming.is_empty() {
        let mut description = String::new();

        for (i, track) in snapshot.upcoming.iter().take(10).enumerate() {
            let duration = match track.duration {
                Some(dur) if !track.live => format!(" `[{}]`", format_duration(dur)),
                _ => String::new(),
            };
            description.push_str(&format!("**{}**. {}{}\n", i + 1, track.title, duration));
        }

        if snapshot.upcoming.len() > 10 {
            description.push_str(&format!("… y {} más\n", snapshot.upcoming.len() - 10));
        }

        embed = embed.field("Próximas canciones", description, false);
    }

    if !snapshot.history.is_empty() {
        let recent: Vec<String> = snapshot
            .history
            .iter()
            .rev()
            .take(3)
            .map(|track| format!("• {}", track.title))
            .collect();
        embed = embed.field("🕘 Recién sonadas", recent.join("\n"), false);
    }

    let mut info = format!(
        "**Total:** {} canciones",
        snapshot.upcoming.len() + usize::from(snapshot.current.is_some())
    );

    let total: Duration = snapshot
        .upcoming
        .iter()
        .filter_map(|track| track.duration)
        .sum();
    if total > Duration::ZERO {
        info.push_str(&format!(" • **Restante:** {}", format_duration(total)));
    }

    info.push_str(&format!(" • **Repetición:** {}", snapshot.repeat.label()));

    if snapshot.autoplay {
        info.push_str(" • 📻 **Autoplay**");
    }

    if !snapshot.filters.is_empty() {
        info.push_str(&format!(" • 🎛️ {}", snapshot.filters.join(", ")));
    }

    info.push_str(&format!(" • 🔊 {:.0}%", snapshot.volume * 100.0));

    embed = embed.field("Información", info, false);

    embed
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Crea un embed para un error de reproducción
pub fn playback_error_embed(track: &Track, error: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ Error de Reproducción")
        .description(format!("No se pudo reproducir **{}**", track.title))
        .field("Detalle", format!("`{}`", error), false)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para cuando autoplay no encuentra continuación
pub fn no_related_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("📻 Autoplay sin resultados")
        .description("No se encontraron canciones relacionadas para continuar")
        .color(colors::WARNING_ORANGE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de despedida al cerrar la sesión
pub fn disconnected_embed(reason: Option<&str>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("👋 Sesión Terminada")
        .description("Me desconecté del canal de voz")
        .color(colors::NEUTRAL_GRAY);

    if let Some(reason) = reason {
        embed = embed.field("Motivo", reason, false);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de error
pub fn error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de éxito
pub fn success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed de información
pub fn info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Barra visual de progreso de reproducción
fn progress_bar(elapsed: Duration, total: Duration) -> String {
    let segments = 20usize;
    let ratio = if total.is_zero() {
        0.0
    } else {
        (elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    };
    let filled = (ratio * segments as f64).round() as usize;

    let bar = "█".repeat(filled) + &"▒".repeat(segments - filled);
    format!("`[{}]`", bar)
}

/// Formatea una duración en formato legible
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_duration_rolls_over_hours() {
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(215)), "3:35");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1:01:01");
    }

    #[test]
    fn test_progress_bar_is_bounded() {
        let empty = progress_bar(Duration::ZERO, Duration::from_secs(100));
        assert!(empty.contains(&"▒".repeat(20)));

        let full = progress_bar(Duration::from_secs(200), Duration::from_secs(100));
        assert!(full.contains(&"█".repeat(20)));

        let live = progress_bar(Duration::from_secs(5), Duration::ZERO);
        assert!(live.contains(&"▒".repeat(20)));
    }
}
