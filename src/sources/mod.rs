pub mod ffmpeg;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;
use songbird::input::Input;
use std::time::Duration;

use crate::player::track::Track;

pub use ffmpeg::FfmpegFactory;
pub use ytdlp::YtDlpResolver;

/// Resultado de resolver una consulta: una canción o una playlist completa.
#[derive(Debug, Clone)]
pub enum Resolved {
    Track(Track),
    Playlist {
        title: Option<String>,
        tracks: Vec<Track>,
    },
}

impl Resolved {
    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            Resolved::Track(track) => vec![track],
            Resolved::Playlist { tracks, .. } => tracks,
        }
    }
}

/// Convierte búsquedas y URLs en pistas reproducibles.
///
/// El reproductor depende solo de este contrato; la implementación que se
/// despacha usa yt-dlp, pero cualquier extractor sirve mientras entregue
/// identidad, metadatos y una URL de stream bajo demanda.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resuelve una consulta o URL en una o varias pistas.
    async fn resolve(&self, query: &str) -> Result<Resolved>;

    /// Adjunta la URL de stream a una pista que aún no la tiene.
    async fn attach_stream_info(&self, track: &mut Track) -> Result<()>;

    /// Busca una pista relacionada para continuar la reproducción,
    /// evitando los ids ya sonados.
    async fn find_related(&self, track: &Track, exclude: &[String]) -> Result<Track>;
}

/// Arma el recurso de audio que consume la conexión de voz.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Crea el recurso para una pista, arrancando en `offset` y con la
    /// lista de transformaciones ya concatenada (argumento de `-af`).
    async fn create<'a>(&self, track: &Track, offset: Duration, filters: Option<&'a str>)
        -> Result<Input>;
}
