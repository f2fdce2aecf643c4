use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// Representa una unidad reproducible dentro de una sesión.
///
/// Inmutable una vez en cola salvo `stream_url`, que el resolver adjunta de
/// forma perezosa justo antes de reproducir.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub url: String,
    pub artist: Option<String>,
    pub duration: Option<Duration>,
    pub live: bool,
    pub thumbnail: Option<String>,
    pub requested_by: Option<UserId>,
    pub stream_url: Option<String>,
    #[allow(dead_code)]
    pub added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            artist: None,
            duration: None,
            live: false,
            thumbnail: None,
            requested_by: None,
            stream_url: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_requested_by(mut self, user_id: UserId) -> Self {
        self.requested_by = Some(user_id);
        self
    }

    #[allow(dead_code)]
    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into());
        self
    }

    pub fn has_stream(&self) -> bool {
        self.stream_url.is_some()
    }
}

/// Entrada del historial; con retención desactivada solo se guarda la
/// identidad, suficiente para que autoplay no repita lo ya sonado.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    Full(Track),
    Stub(String),
}

impl HistoryEntry {
    pub fn of(track: Track, keep: bool) -> Self {
        if keep {
            HistoryEntry::Full(track)
        } else {
            HistoryEntry::Stub(track.id)
        }
    }

    pub fn id(&self) -> &str {
        match self {
            HistoryEntry::Full(track) => &track.id,
            HistoryEntry::Stub(id) => id,
        }
    }

    pub fn into_track(self) -> Option<Track> {
        match self {
            HistoryEntry::Full(track) => Some(track),
            HistoryEntry::Stub(_) => None,
        }
    }
}

/// Modo de repetición de la sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Track,
    Queue,
}

impl RepeatMode {
    /// Siguiente paso del ciclo Off → Track → Queue → Off.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Queue,
            RepeatMode::Queue => RepeatMode::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "desactivada",
            RepeatMode::Track => "canción",
            RepeatMode::Queue => "cola",
        }
    }
}

/// Por qué avanza la cola: fin natural de la pista o una orden del usuario.
///
/// Las operaciones manuales dejan la cola ya ordenada antes de detener el
/// recurso; el manejador de fin solo reproduce el frente. El avance natural
/// corre el algoritmo completo de repetición/autoplay/historial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    Natural,
    Manual(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repeat_mode_cycles_back_to_off() {
        let mode = RepeatMode::Off;
        let mode = mode.cycled();
        assert_eq!(mode, RepeatMode::Track);
        let mode = mode.cycled();
        assert_eq!(mode, RepeatMode::Queue);
        let mode = mode.cycled();
        assert_eq!(mode, RepeatMode::Off);
    }

    #[test]
    fn test_track_builder_sets_fields() {
        let track = Track::new("abc123", "Una Canción", "https://example.com/v/abc123")
            .with_artist("Alguien")
            .with_duration(Duration::from_secs(215))
            .with_live(false)
            .with_thumbnail("https://example.com/thumb.jpg");

        assert_eq!(track.id, "abc123");
        assert_eq!(track.artist.as_deref(), Some("Alguien"));
        assert_eq!(track.duration, Some(Duration::from_secs(215)));
        assert!(!track.live);
        assert!(!track.has_stream());
    }

    #[test]
    fn test_history_entry_keeps_identity_without_retention() {
        let track = Track::new("xyz", "Otra", "https://example.com/v/xyz");
        let stub = HistoryEntry::of(track.clone(), false);
        assert_eq!(stub.id(), "xyz");
        assert!(stub.into_track().is_none());

        let full = HistoryEntry::of(track, true);
        assert_eq!(full.id(), "xyz");
        assert!(full.into_track().is_some());
    }
}
