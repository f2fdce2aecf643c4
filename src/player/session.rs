use parking_lot::Mutex as SyncMutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::player::error::PlayerError;
use crate::player::filters::FilterChain;
use crate::player::task_queue::TaskQueue;
use crate::player::track::{AdvanceReason, HistoryEntry, RepeatMode, Track};
use crate::player::voice::VoiceSession;
use crate::sources::TrackResolver;

/// Política inicial de una sesión; sale de la configuración global más los
/// ajustes guardados del servidor.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub volume: f32,
    pub autoplay: bool,
    pub keep_history: bool,
    pub leave_on_stop: bool,
    pub leave_on_finish: bool,
    pub max_queue: usize,
    pub max_history: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            volume: 0.5,
            autoplay: false,
            keep_history: true,
            leave_on_stop: true,
            leave_on_finish: true,
            max_queue: 100,
            max_history: 50,
        }
    }
}

/// Estado de cola de una sesión: pistas por sonar, historial y política.
///
/// `items[0]` es siempre la pista que suena o está a punto de sonar. Las
/// operaciones manuales dejan aquí la cola ya ordenada y anotan `pending`
/// antes de detener el recurso; el manejador de fin lee esa anotación para
/// saber si corre el algoritmo de avance natural o solo reproduce el frente.
/// Todo acceso ocurre con el ticket de la sesión en mano.
pub(crate) struct QueueState {
    pub items: VecDeque<Track>,
    pub history: VecDeque<HistoryEntry>,
    pub repeat: RepeatMode,
    pub autoplay: bool,
    pub keep_history: bool,
    pub max_queue: usize,
    pub max_history: usize,
    pub pending: Option<AdvanceReason>,
    pub stopped: bool,
}

/// Punto de arranque del recurso vivo dentro de la pista.
///
/// Cada reinicio (seek o cambio de filtros) crea un recurso nuevo cuyo
/// reloj vuelve a cero; aquí queda anotado dónde arrancó, para que el
/// tiempo transcurrido siga siendo absoluto respecto de la pista.
pub(crate) struct PlayOffset {
    base: SyncMutex<Duration>,
}

impl PlayOffset {
    pub fn new() -> Self {
        Self {
            base: SyncMutex::new(Duration::ZERO),
        }
    }

    /// Recurso nuevo arrancando en `offset`.
    pub fn rebase(&self, offset: Duration) {
        *self.base.lock() = offset;
    }

    /// Pista nueva desde el comienzo.
    pub fn reset(&self) {
        self.rebase(Duration::ZERO);
    }

    /// Posición absoluta a partir de la que reporta el driver.
    pub fn absolute(&self, driver_position: Duration) -> Duration {
        *self.base.lock() + driver_position
    }
}

/// Resultado de la primera fase del avance natural: qué hacer una vez que
/// la política de repetición ya quedó aplicada sobre la cola.
#[derive(Debug, Clone)]
pub(crate) enum NaturalStep {
    /// No había nada sonando; la sesión debe desmontarse.
    Teardown,
    /// Repetición de pista: reiniciar desde cero sin anunciar de nuevo.
    Replay(Track),
    /// Avanzar al frente siguiente; la repetición de cola ya re-encoló.
    Advance(Track),
    /// Avanzar, pero antes buscar una continuación para la cola corta.
    Continuation { finished: Track, exclude: Vec<String> },
}

impl QueueState {
    pub fn new(opts: &SessionOptions) -> Self {
        Self {
            items: VecDeque::new(),
            history: VecDeque::new(),
            repeat: RepeatMode::Off,
            autoplay: opts.autoplay,
            keep_history: opts.keep_history,
            max_queue: opts.max_queue,
            max_history: opts.max_history,
            pending: None,
            stopped: false,
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.items.front()
    }

    /// Añade pistas al final; todo o nada frente al límite de la cola.
    pub fn arrange_enqueue(&mut self, tracks: Vec<Track>) -> Result<usize, PlayerError> {
        if tracks.is_empty() {
            return Ok(0);
        }
        if self.items.len() + tracks.len() > self.max_queue {
            return Err(PlayerError::QueueFull(self.max_queue));
        }
        let added = tracks.len();
        self.items.extend(tracks);
        Ok(added)
    }

    /// Pasa una pista al historial respetando retención y tope.
    pub fn archive(&mut self, track: Track) {
        self.history
            .push_back(HistoryEntry::of(track, self.keep_history));
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    /// Archiva la pista actual y deja la siguiente al frente.
    pub fn arrange_skip(&mut self) -> Result<(), PlayerError> {
        if self.items.len() <= 1 {
            return Err(PlayerError::NoUpNext);
        }
        if let Some(current) = self.items.pop_front() {
            self.archive(current);
        }
        Ok(())
    }

    /// Antepone la pista anterior; la actual queda como siguiente.
    ///
    /// Prefiere el historial; sin historial y con repetición de cola, rota
    /// la última pista al frente.
    pub fn arrange_previous(&mut self) -> Result<(), PlayerError> {
        if let Some(entry) = self.history.pop_back() {
            return match entry {
                HistoryEntry::Full(track) => {
                    self.items.push_front(track);
                    Ok(())
                }
                HistoryEntry::Stub(id) => {
                    self.history.push_back(HistoryEntry::Stub(id));
                    Err(PlayerError::DisabledOption("keep_history"))
                }
            };
        }
        if self.repeat == RepeatMode::Queue && self.items.len() > 1 {
            if let Some(last) = self.items.pop_back() {
                self.items.push_front(last);
            }
            return Ok(());
        }
        Err(PlayerError::NoPrevious)
    }

    /// Salto 1-based hacia adelante o negativo hacia atrás.
    ///
    /// Hacia adelante archiva todo lo anterior al destino; hacia atrás
    /// devuelve las últimas `|n|` entradas del historial al frente de la
    /// cola conservando su orden.
    pub fn arrange_jump(&mut self, position: i64) -> Result<(), PlayerError> {
        if position >= 0 {
            let target = position as usize;
            if target <= 1 || target > self.items.len() {
                return Err(PlayerError::NoSongAtPosition(position));
            }
            for _ in 0..target - 1 {
                if let Some(track) = self.items.pop_front() {
                    self.archive(track);
                }
            }
            Ok(())
        } else {
            let span = position.unsigned_abs() as usize;
            if span > self.history.len() {
                return Err(PlayerError::NoSongAtPosition(position));
            }
            let mut restored: Vec<HistoryEntry> = Vec::with_capacity(span);
            for _ in 0..span {
                if let Some(entry) = self.history.pop_back() {
                    restored.push(entry);
                }
            }
            // Un hueco sin retención invalida el salto entero.
            if restored
                .iter()
                .any(|entry| matches!(entry, HistoryEntry::Stub(_)))
            {
                for entry in restored.into_iter().rev() {
                    self.history.push_back(entry);
                }
                return Err(PlayerError::DisabledOption("keep_history"));
            }
            for entry in restored {
                if let Some(track) = entry.into_track() {
                    self.items.push_front(track);
                }
            }
            Ok(())
        }
    }

    /// Baraja todo menos la pista que está sonando.
    pub fn shuffle_upcoming(&mut self) {
        self.shuffle_upcoming_with(&mut rand::thread_rng());
    }

    fn shuffle_upcoming_with<R: Rng>(&mut self, rng: &mut R) {
        if self.items.len() > 2 {
            let items = self.items.make_contiguous();
            items[1..].shuffle(rng);
        }
    }

    /// Sin argumento avanza el ciclo; con el modo ya activo lo apaga.
    pub fn set_repeat(&mut self, mode: Option<RepeatMode>) -> RepeatMode {
        self.repeat = match mode {
            None => self.repeat.cycled(),
            Some(mode) if mode == self.repeat => RepeatMode::Off,
            Some(mode) => mode,
        };
        self.repeat
    }

    /// Primera fase del avance natural: aplica la política de repetición y
    /// decide si hace falta una continuación de autoplay.
    ///
    /// Solo el fin de stream llega aquí; skip/previous/jump dejan la cola
    /// ordenada por su cuenta y la repetición no re-encola en esos casos.
    pub fn arrange_natural(&mut self) -> NaturalStep {
        let Some(finished) = self.current().cloned() else {
            return NaturalStep::Teardown;
        };
        if self.repeat == RepeatMode::Track {
            return NaturalStep::Replay(finished);
        }
        if self.repeat == RepeatMode::Queue {
            self.items.push_back(finished.clone());
        }
        if self.autoplay && self.items.len() <= 1 {
            let exclude = self.exclusion_ids();
            return NaturalStep::Continuation { finished, exclude };
        }
        NaturalStep::Advance(finished)
    }

    /// Segunda fase: archiva la pista terminada y deja la siguiente al
    /// frente. Devuelve si quedó algo por reproducir.
    pub fn finish_front(&mut self) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        if let Some(done) = self.items.pop_front() {
            self.archive(done);
        }
        true
    }

    /// Ids que autoplay no debe repetir: historial completo más lo encolado.
    pub fn exclusion_ids(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|entry| entry.id().to_string())
            .chain(self.items.iter().map(|track| track.id.clone()))
            .collect()
    }
}

/// Foto del estado de una sesión para la capa de presentación.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub current: Option<Track>,
    pub upcoming: Vec<Track>,
    pub history: Vec<Track>,
    pub repeat: RepeatMode,
    pub autoplay: bool,
    pub volume: f32,
    pub paused: bool,
    pub filters: Vec<String>,
}

/// Agregado por servidor: cola, filtros, conexión de voz y su ticket.
///
/// No expone operaciones de mutación propias; el manejador de sesiones es
/// quien las ejecuta, siempre bajo el ticket de `tasks`.
pub struct PlaybackSession {
    guild_id: GuildId,
    text_channel: ChannelId,
    pub(crate) queue: SyncMutex<QueueState>,
    pub(crate) filters: SyncMutex<FilterChain>,
    pub(crate) voice: Arc<VoiceSession>,
    pub(crate) tasks: TaskQueue,
    pub(crate) offset: PlayOffset,
    pub(crate) opts: SessionOptions,
}

impl PlaybackSession {
    pub(crate) fn new(
        guild_id: GuildId,
        text_channel: ChannelId,
        voice: Arc<VoiceSession>,
        opts: SessionOptions,
    ) -> Self {
        Self {
            guild_id,
            text_channel,
            queue: SyncMutex::new(QueueState::new(&opts)),
            filters: SyncMutex::new(FilterChain::new()),
            voice,
            tasks: TaskQueue::new(),
            offset: PlayOffset::new(),
            opts,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Canal de texto donde se anuncia lo que pasa en esta sesión.
    pub fn text_channel(&self) -> ChannelId {
        self.text_channel
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice.channel()
    }

    pub fn is_paused(&self) -> bool {
        self.voice.is_paused()
    }

    pub fn volume(&self) -> f32 {
        self.voice.volume()
    }

    /// Tiempo transcurrido de la pista actual: punto de arranque del
    /// recurso vivo más lo que el driver lleva reproducido de él.
    pub async fn elapsed(&self) -> Duration {
        self.offset.absolute(self.voice.position().await)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let queue = self.queue.lock();
        SessionSnapshot {
            current: queue.items.front().cloned(),
            upcoming: queue.items.iter().skip(1).cloned().collect(),
            history: queue
                .history
                .iter()
                .filter_map(|entry| match entry {
                    HistoryEntry::Full(track) => Some(track.clone()),
                    HistoryEntry::Stub(_) => None,
                })
                .collect(),
            repeat: queue.repeat,
            autoplay: queue.autoplay,
            volume: self.voice.volume(),
            paused: self.voice.is_paused(),
            filters: self.filters.lock().names(),
        }
    }
}

/// Pide al resolver una pista relacionada con `seed`, sin repetir ids.
pub(crate) async fn find_continuation(
    resolver: &dyn TrackResolver,
    seed: &Track,
    exclude: &[String],
) -> Result<Track, PlayerError> {
    resolver.find_related(seed, exclude).await.map_err(|e| {
        debug!("🔍 Sin continuación para {}: {}", seed.title, e);
        PlayerError::NoRelated(seed.title.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockTrackResolver;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Canción {id}"), format!("https://example.com/{id}"))
    }

    fn state_with(ids: &[&str]) -> QueueState {
        let mut state = QueueState::new(&SessionOptions::default());
        state
            .arrange_enqueue(ids.iter().map(|id| track(id)).collect())
            .unwrap();
        state
    }

    fn item_ids(state: &QueueState) -> Vec<String> {
        state.items.iter().map(|t| t.id.clone()).collect()
    }

    fn history_ids(state: &QueueState) -> Vec<String> {
        state.history.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_enqueue_rejects_overflow_without_touching_queue() {
        let mut state = QueueState::new(&SessionOptions {
            max_queue: 3,
            ..SessionOptions::default()
        });
        state.arrange_enqueue(vec![track("a"), track("b")]).unwrap();

        let err = state
            .arrange_enqueue(vec![track("c"), track("d")])
            .unwrap_err();
        assert!(matches!(err, PlayerError::QueueFull(3)));
        assert_eq!(item_ids(&state), vec!["a", "b"]);

        state.arrange_enqueue(vec![track("c")]).unwrap();
        assert_eq!(item_ids(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_skip_archives_current() {
        let mut state = state_with(&["a", "b", "c"]);
        state.arrange_skip().unwrap();
        assert_eq!(item_ids(&state), vec!["b", "c"]);
        assert_eq!(history_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_skip_on_single_item_fails_and_leaves_queue_untouched() {
        let mut state = state_with(&["a"]);
        let err = state.arrange_skip().unwrap_err();
        assert!(matches!(err, PlayerError::NoUpNext));
        assert_eq!(item_ids(&state), vec!["a"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_jump_forward_archives_skipped_items() {
        // Con [A,B,C,D,E], saltar al 3 deja [C,D,E] y archiva [A,B].
        let mut state = state_with(&["a", "b", "c", "d", "e"]);
        state.arrange_jump(3).unwrap();
        assert_eq!(item_ids(&state), vec!["c", "d", "e"]);
        assert_eq!(history_ids(&state), vec!["a", "b"]);

        state.arrange_jump(-1).unwrap();
        assert_eq!(item_ids(&state), vec!["b", "c", "d", "e"]);
        assert_eq!(history_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_jump_round_trip_restores_split() {
        let mut state = state_with(&["a", "b", "c", "d", "e"]);
        state.arrange_jump(3).unwrap();
        state.arrange_jump(-2).unwrap();
        assert_eq!(item_ids(&state), vec!["a", "b", "c", "d", "e"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_jump_rejects_invalid_positions() {
        let mut state = state_with(&["a", "b", "c"]);
        assert!(matches!(
            state.arrange_jump(0),
            Err(PlayerError::NoSongAtPosition(0))
        ));
        assert!(matches!(
            state.arrange_jump(1),
            Err(PlayerError::NoSongAtPosition(1))
        ));
        assert!(matches!(
            state.arrange_jump(4),
            Err(PlayerError::NoSongAtPosition(4))
        ));
        assert!(matches!(
            state.arrange_jump(-1),
            Err(PlayerError::NoSongAtPosition(-1))
        ));
        assert_eq!(item_ids(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_jump_back_without_retention_fails_and_preserves_history() {
        let mut state = QueueState::new(&SessionOptions {
            keep_history: false,
            ..SessionOptions::default()
        });
        state
            .arrange_enqueue(vec![track("a"), track("b"), track("c")])
            .unwrap();
        state.arrange_jump(3).unwrap();
        assert_eq!(history_ids(&state), vec!["a", "b"]);

        let err = state.arrange_jump(-2).unwrap_err();
        assert!(matches!(err, PlayerError::DisabledOption(_)));
        assert_eq!(history_ids(&state), vec!["a", "b"]);
        assert_eq!(item_ids(&state), vec!["c"]);
    }

    #[test]
    fn test_previous_prefers_history() {
        let mut state = state_with(&["a", "b"]);
        state.arrange_skip().unwrap();
        assert_eq!(item_ids(&state), vec!["b"]);

        state.arrange_previous().unwrap();
        assert_eq!(item_ids(&state), vec!["a", "b"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_previous_wraps_queue_in_queue_repeat_mode() {
        let mut state = state_with(&["a", "b", "c"]);
        state.set_repeat(Some(RepeatMode::Queue));
        state.arrange_previous().unwrap();
        assert_eq!(item_ids(&state), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_previous_without_history_fails() {
        let mut state = state_with(&["a", "b"]);
        let err = state.arrange_previous().unwrap_err();
        assert!(matches!(err, PlayerError::NoPrevious));
        assert_eq!(item_ids(&state), vec!["a", "b"]);
    }

    #[test]
    fn test_previous_with_stub_history_fails_and_keeps_stub() {
        let mut state = QueueState::new(&SessionOptions {
            keep_history: false,
            ..SessionOptions::default()
        });
        state.arrange_enqueue(vec![track("a"), track("b")]).unwrap();
        state.arrange_skip().unwrap();

        let err = state.arrange_previous().unwrap_err();
        assert!(matches!(err, PlayerError::DisabledOption(_)));
        assert_eq!(history_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_shuffle_never_moves_front() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen_second: Vec<String> = Vec::new();
        for _ in 0..200 {
            let mut state = state_with(&["a", "b", "c", "d"]);
            state.shuffle_upcoming_with(&mut rng);
            assert_eq!(state.items[0].id, "a");
            seen_second.push(state.items[1].id.clone());
        }
        // Las tres pistas restantes deben pasar todas por la posición 1.
        for id in ["b", "c", "d"] {
            assert!(seen_second.iter().any(|s| s == id));
        }
    }

    #[test]
    fn test_repeat_cycle_and_explicit_toggle() {
        let mut state = state_with(&["a"]);
        assert_eq!(state.set_repeat(None), RepeatMode::Track);
        assert_eq!(state.set_repeat(None), RepeatMode::Queue);
        assert_eq!(state.set_repeat(None), RepeatMode::Off);

        assert_eq!(state.set_repeat(Some(RepeatMode::Track)), RepeatMode::Track);
        assert_eq!(state.set_repeat(Some(RepeatMode::Track)), RepeatMode::Off);
        assert_eq!(state.set_repeat(Some(RepeatMode::Queue)), RepeatMode::Queue);
    }

    #[test]
    fn test_history_respects_cap() {
        let mut state = QueueState::new(&SessionOptions {
            max_history: 3,
            ..SessionOptions::default()
        });
        for id in ["a", "b", "c", "d", "e"] {
            state.archive(track(id));
        }
        assert_eq!(history_ids(&state), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_natural_advance_requeues_only_in_queue_repeat() {
        let mut state = state_with(&["a", "b"]);
        state.set_repeat(Some(RepeatMode::Queue));

        let step = state.arrange_natural();
        assert!(matches!(step, NaturalStep::Advance(ref t) if t.id == "a"));
        assert_eq!(item_ids(&state), vec!["a", "b", "a"]);

        assert!(state.finish_front());
        assert_eq!(item_ids(&state), vec!["b", "a"]);
        assert_eq!(history_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_natural_replay_in_track_repeat_leaves_queue_untouched() {
        let mut state = state_with(&["a", "b"]);
        state.set_repeat(Some(RepeatMode::Track));

        let step = state.arrange_natural();
        assert!(matches!(step, NaturalStep::Replay(ref t) if t.id == "a"));
        assert_eq!(item_ids(&state), vec!["a", "b"]);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_natural_requests_continuation_when_queue_runs_dry() {
        let mut state = QueueState::new(&SessionOptions {
            autoplay: true,
            ..SessionOptions::default()
        });
        state.arrange_enqueue(vec![track("a")]).unwrap();
        state.archive(track("z"));

        match state.arrange_natural() {
            NaturalStep::Continuation { finished, exclude } => {
                assert_eq!(finished.id, "a");
                assert_eq!(exclude, vec!["z", "a"]);
            }
            other => panic!("se esperaba Continuation, llegó {other:?}"),
        }
    }

    #[test]
    fn test_natural_with_deep_queue_skips_continuation_lookup() {
        let mut state = QueueState::new(&SessionOptions {
            autoplay: true,
            ..SessionOptions::default()
        });
        state.arrange_enqueue(vec![track("a"), track("b")]).unwrap();
        assert!(matches!(state.arrange_natural(), NaturalStep::Advance(_)));
    }

    #[test]
    fn test_natural_on_empty_queue_tears_down() {
        let mut state = QueueState::new(&SessionOptions::default());
        assert!(matches!(state.arrange_natural(), NaturalStep::Teardown));
        assert!(!state.finish_front());
    }

    #[test]
    fn test_finish_front_reports_exhaustion_on_last_item() {
        let mut state = state_with(&["a"]);
        assert!(!state.finish_front());
        assert_eq!(item_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_manual_skip_does_not_requeue_in_queue_repeat() {
        let mut state = state_with(&["a", "b"]);
        state.set_repeat(Some(RepeatMode::Queue));
        state.arrange_skip().unwrap();
        assert_eq!(item_ids(&state), vec!["b"]);
        assert_eq!(history_ids(&state), vec!["a"]);
    }

    #[test]
    fn test_play_offset_keeps_elapsed_absolute_across_restarts() {
        let offset = PlayOffset::new();
        assert_eq!(offset.absolute(Duration::from_secs(10)), Duration::from_secs(10));

        // Un seek a 2:00 crea un recurso cuyo reloj arranca en cero.
        offset.rebase(Duration::from_secs(120));
        assert_eq!(
            offset.absolute(Duration::from_secs(10)),
            Duration::from_secs(130)
        );

        // Un cambio de filtros reinicia en la posición absoluta vigente.
        offset.rebase(Duration::from_secs(130));
        assert_eq!(
            offset.absolute(Duration::from_secs(5)),
            Duration::from_secs(135)
        );

        offset.reset();
        assert_eq!(offset.absolute(Duration::from_secs(3)), Duration::from_secs(3));
    }

    #[test]
    fn test_exclusion_ids_cover_history_and_upcoming() {
        let mut state = state_with(&["b", "c"]);
        state.archive(track("a"));
        let ids = state.exclusion_ids();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_find_continuation_returns_related_track() {
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_find_related()
            .withf(|_, exclude| exclude.contains(&"seed".to_string()))
            .returning(|_, _| Ok(Track::new("rel", "Relacionada", "https://example.com/rel")));

        let seed = track("seed");
        let related = find_continuation(&resolver, &seed, &["seed".to_string()])
            .await
            .unwrap();
        assert_eq!(related.id, "rel");
    }

    #[tokio::test]
    async fn test_find_continuation_maps_resolver_failure() {
        let mut resolver = MockTrackResolver::new();
        resolver
            .expect_find_related()
            .returning(|_, _| Err(anyhow::anyhow!("sin resultados")));

        let seed = track("seed");
        let err = find_continuation(&resolver, &seed, &[]).await.unwrap_err();
        assert!(matches!(err, PlayerError::NoRelated(_)));
    }
}
