use serenity::model::id::GuildId;
use std::time::Duration;
use thiserror::Error;

/// Errores de las operaciones del reproductor.
///
/// Los de validación y política se devuelven directamente al que llama sin
/// tocar estado; los de transporte y resolución viajan por las señales del
/// bus y terminan en salto de pista o en el desmontaje de la sesión.
#[derive(Debug, Error)]
pub enum PlayerError {
    // Validación
    #[error("volumen inválido: {0} (debe ser mayor o igual a 0)")]
    InvalidVolume(f32),
    #[error("posición de búsqueda inválida: {requested:?} (duración {duration:?})")]
    InvalidSeek {
        requested: Duration,
        duration: Option<Duration>,
    },
    #[error("no hay canción en la posición {0}")]
    NoSongAtPosition(i64),

    // Política
    #[error("no hay nada reproduciéndose")]
    NothingPlaying,
    #[error("no hay más canciones en la cola")]
    NoUpNext,
    #[error("no hay canciones anteriores")]
    NoPrevious,
    #[error("opción deshabilitada: {0}")]
    DisabledOption(&'static str),
    #[error("ya existe una sesión para el servidor {0}")]
    SessionExists(GuildId),
    #[error("no hay sesión activa para el servidor {0}")]
    NoSession(GuildId),
    #[error("la cola está llena (máximo {0} canciones)")]
    QueueFull(usize),
    #[error("el filtro {0} ya está activo")]
    FilterExists(String),
    #[error("no existe el filtro {0}")]
    NoSuchFilter(String),

    // Transporte
    #[error("tiempo de espera agotado al conectar al canal de voz")]
    ConnectTimeout,
    #[error("reconexión fallida tras {0} intentos")]
    ReconnectFailed(u32),
    #[error("error al unirse al canal de voz: {0}")]
    Join(#[from] songbird::error::JoinError),

    // Resolución
    #[error("no se encontraron canciones relacionadas con {0}")]
    NoRelated(String),
    #[error("error al resolver la fuente: {0}")]
    Resolve(String),
    #[error("error al crear el recurso de audio: {0}")]
    Resource(String),
}
