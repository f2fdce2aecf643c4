use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use url::Url;

use super::{Resolved, TrackResolver};
use crate::player::track::Track;

/// Cuántas entradas de la mezcla se revisan buscando una continuación.
const MIX_PROBE_DEPTH: usize = 15;

/// Resolver respaldado por yt-dlp.
///
/// Cada consulta lanza un proceso yt-dlp y parsea su salida JSON; un
/// semáforo limita los procesos simultáneos para no atraer rate limiting.
pub struct YtDlpResolver {
    limiter: Semaphore,
    max_playlist: usize,
}

/// Entrada JSON de yt-dlp; en modo flat-playlist faltan varios campos.
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: String,
    duration: Option<f64>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    is_live: Option<bool>,
    playlist_title: Option<String>,
}

impl YtDlpEntry {
    fn into_track(self) -> Track {
        let url = self
            .webpage_url
            .or_else(|| self.url.filter(|u| u.starts_with("http")))
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));

        let mut track = Track::new(self.id, self.title, url);
        if let Some(artist) = self.uploader {
            track = track.with_artist(artist);
        }
        if let Some(duration) = self.duration {
            track = track.with_duration(Duration::from_secs_f64(duration));
        }
        if let Some(thumbnail) = self.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }
        track.with_live(self.is_live.unwrap_or(false))
    }
}

impl YtDlpResolver {
    pub fn new(max_playlist: usize) -> Self {
        Self {
            // Tres procesos yt-dlp a la vez como mucho
            limiter: Semaphore::new(3),
            max_playlist,
        }
    }

    /// Verifica que yt-dlp esté instalado y responda.
    pub async fn verify() -> Result<()> {
        let output = Command::new("yt-dlp")
            .arg("--version")
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;
        if !output.status.success() {
            anyhow::bail!("yt-dlp no disponible");
        }
        let version = String::from_utf8_lossy(&output.stdout);
        info!("✅ yt-dlp versión: {}", version.trim());
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let _permit = self.limiter.acquire().await?;
        let output = Command::new("yt-dlp")
            .args(args)
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn resolve_single(&self, url: &str) -> Result<Track> {
        debug!("📊 Obteniendo info de: {}", url);
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", url])
            .await?;
        let entry: YtDlpEntry = serde_json::from_str(stdout.trim())
            .context("Error al parsear respuesta de yt-dlp")?;
        Ok(entry.into_track())
    }

    async fn resolve_search(&self, query: &str) -> Result<Track> {
        info!("🔍 Buscando en YouTube: {}", query);
        let search = format!("ytsearch1:{}", query);
        let stdout = self
            .run(&["--no-playlist", "--dump-json", "--no-warnings", &search])
            .await?;
        let line = stdout
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .with_context(|| format!("sin resultados para: {}", query))?;
        let entry: YtDlpEntry =
            serde_json::from_str(line).context("Error al parsear respuesta de yt-dlp")?;
        Ok(entry.into_track())
    }

    async fn resolve_playlist(&self, url: &str) -> Result<Resolved> {
        info!("📋 Obteniendo playlist: {}", url);
        let end = self.max_playlist.to_string();
        let stdout = self
            .run(&[
                "--flat-playlist",
                "--dump-json",
                "--playlist-end",
                &end,
                "--no-warnings",
                url,
            ])
            .await?;

        let mut title = None;
        let mut tracks = Vec::new();
        for line in stdout.lines() {
            if let Ok(entry) = serde_json::from_str::<YtDlpEntry>(line) {
                if title.is_none() {
                    title = entry.playlist_title.clone();
                }
                tracks.push(entry.into_track());
            }
        }
        if tracks.is_empty() {
            anyhow::bail!("la playlist no tiene entradas reproducibles");
        }
        info!("🎵 Playlist extraída con {} pistas", tracks.len());
        Ok(Resolved::Playlist { title, tracks })
    }

    fn is_url(input: &str) -> bool {
        Url::parse(input)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    fn is_playlist_url(url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| {
                parsed
                    .query_pairs()
                    .any(|(key, value)| key == "list" && !value.starts_with("RD"))
            })
            .unwrap_or(false)
    }

    /// Extrae el id de video de una URL de YouTube.
    fn video_id(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            return Some(value.into_owned());
        }
        if parsed.host_str() == Some("youtu.be") {
            if let Some(mut segments) = parsed.path_segments() {
                if let Some(id) = segments.next() {
                    if !id.is_empty() {
                        return Some(id.to_string());
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Resolved> {
        if Self::is_url(query) {
            if Self::is_playlist_url(query) {
                return self.resolve_playlist(query).await;
            }
            let track = self.resolve_single(query).await?;
            return Ok(Resolved::Track(track));
        }
        let track = self.resolve_search(query).await?;
        Ok(Resolved::Track(track))
    }

    async fn attach_stream_info(&self, track: &mut Track) -> Result<()> {
        debug!("🎵 Obteniendo URL de stream para: {}", track.title);
        let stdout = self
            .run(&[
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "--get-url",
                "--no-warnings",
                &track.url,
            ])
            .await?;

        let stream_url = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
            .to_string();
        if stream_url.is_empty() {
            anyhow::bail!("No se pudo obtener URL de stream");
        }
        track.stream_url = Some(stream_url);
        Ok(())
    }

    /// Busca una continuación en la mezcla (lista RD) de la pista semilla.
    async fn find_related(&self, track: &Track, exclude: &[String]) -> Result<Track> {
        let seed = Self::video_id(&track.url).unwrap_or_else(|| track.id.clone());
        let mix_url = format!("https://www.youtube.com/watch?v={seed}&list=RD{seed}");
        debug!("📻 Buscando relacionadas en la mezcla de {}", track.title);

        let depth = MIX_PROBE_DEPTH.to_string();
        let stdout = self
            .run(&[
                "--flat-playlist",
                "--dump-json",
                "--playlist-end",
                &depth,
                "--no-warnings",
                &mix_url,
            ])
            .await?;

        for line in stdout.lines() {
            if let Ok(entry) = serde_json::from_str::<YtDlpEntry>(line) {
                if entry.id == seed || exclude.iter().any(|id| id == &entry.id) {
                    continue;
                }
                if entry.is_live.unwrap_or(false) {
                    continue;
                }
                return Ok(entry.into_track());
            }
        }
        anyhow::bail!("sin canciones relacionadas para: {}", track.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_vs_search_detection() {
        assert!(YtDlpResolver::is_url("https://youtu.be/abc"));
        assert!(YtDlpResolver::is_url("http://example.com/audio.mp3"));
        assert!(!YtDlpResolver::is_url("norah jones sunrise"));
        assert!(!YtDlpResolver::is_url("ftp://example.com/archivo"));
    }

    #[test]
    fn test_playlist_url_detection() {
        assert!(YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/playlist?list=PL123"
        ));
        assert!(YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PL123"
        ));
        // Las mezclas RD son continuaciones, no playlists del usuario.
        assert!(!YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=RDabc"
        ));
        assert!(!YtDlpResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=abc"
        ));
    }

    #[test]
    fn test_video_id_extraction() {
        assert_eq!(
            YtDlpResolver::video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            YtDlpResolver::video_id("https://youtu.be/dQw4w9WgXcQ?t=30"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(YtDlpResolver::video_id("https://example.com/"), None);
    }

    #[test]
    fn test_entry_parse_full() {
        let json = r#"{
            "id": "abc123",
            "title": "Una Canción",
            "duration": 215.0,
            "uploader": "Alguien",
            "thumbnail": "https://i.ytimg.com/vi/abc123/hq720.jpg",
            "webpage_url": "https://www.youtube.com/watch?v=abc123",
            "is_live": false
        }"#;
        let entry: YtDlpEntry = serde_json::from_str(json).unwrap();
        let track = entry.into_track();

        assert_eq!(track.id, "abc123");
        assert_eq!(track.title, "Una Canción");
        assert_eq!(track.artist.as_deref(), Some("Alguien"));
        assert_eq!(track.duration, Some(Duration::from_secs(215)));
        assert!(!track.live);
    }

    #[test]
    fn test_flat_entry_builds_watch_url() {
        // En modo flat-playlist no viene webpage_url y url trae solo el id.
        let json = r#"{"id": "xyz789", "title": "Otra", "url": "xyz789"}"#;
        let entry: YtDlpEntry = serde_json::from_str(json).unwrap();
        let track = entry.into_track();

        assert_eq!(track.url, "https://www.youtube.com/watch?v=xyz789");
        assert!(track.duration.is_none());
    }
}
