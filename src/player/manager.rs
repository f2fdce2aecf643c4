use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::player::error::PlayerError;
use crate::player::events::{EventBus, PlayerEvent};
use crate::player::filters::FilterChain;
use crate::player::session::{find_continuation, NaturalStep, PlaybackSession, SessionOptions};
use crate::player::task_queue::TaskGuard;
use crate::player::track::{AdvanceReason, Direction, RepeatMode, Track};
use crate::player::voice::{VoiceSession, VoiceSignal};
use crate::sources::{ResourceFactory, TrackResolver};

/// Registro y orquestador de las sesiones de reproducción.
///
/// Todas las mutaciones de una sesión pasan por aquí y toman primero el
/// ticket de esa sesión, tanto las órdenes de usuario como las señales del
/// transporte. Sesiones de servidores distintos corren en paralelo sin
/// ningún candado global.
pub struct SessionManager {
    songbird: Arc<Songbird>,
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    events: EventBus,
    resolver: Arc<dyn TrackResolver>,
    factory: Arc<dyn ResourceFactory>,
}

impl SessionManager {
    pub fn new(
        songbird: Arc<Songbird>,
        resolver: Arc<dyn TrackResolver>,
        factory: Arc<dyn ResourceFactory>,
        events: EventBus,
    ) -> Self {
        Self {
            songbird,
            sessions: DashMap::new(),
            events,
            resolver,
            factory,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn required(&self, guild_id: GuildId) -> Result<Arc<PlaybackSession>, PlayerError> {
        self.get(guild_id).ok_or(PlayerError::NoSession(guild_id))
    }

    /// Rechaza operaciones sobre una sesión ya marcada como terminada.
    fn ensure_live(&self, session: &PlaybackSession) -> Result<(), PlayerError> {
        if session.queue.lock().stopped {
            return Err(PlayerError::NoSession(session.guild_id()));
        }
        Ok(())
    }

    /// Crea la sesión del servidor, conecta la voz y arranca la primera pista.
    pub async fn create(
        self: &Arc<Self>,
        guild_id: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        tracks: Vec<Track>,
        opts: SessionOptions,
    ) -> Result<(), PlayerError> {
        if !opts.volume.is_finite() || opts.volume < 0.0 {
            return Err(PlayerError::InvalidVolume(opts.volume));
        }
        if self.sessions.contains_key(&guild_id) {
            return Err(PlayerError::SessionExists(guild_id));
        }

        let (voice, signal_rx) =
            VoiceSession::connect(self.songbird.clone(), guild_id, voice_channel, opts.volume)
                .await?;

        let session = Arc::new(PlaybackSession::new(
            guild_id,
            text_channel,
            voice.clone(),
            opts,
        ));

        // Dos create simultáneos se resuelven a favor del que registró
        // primero; el perdedor apaga lo suyo sin tocar la conexión ajena.
        match self.sessions.entry(guild_id) {
            Entry::Occupied(_) => {
                voice.halt();
                return Err(PlayerError::SessionExists(guild_id));
            }
            Entry::Vacant(entry) => {
                entry.insert(session.clone());
            }
        }

        tokio::spawn(Self::run_signal_loop(self.clone(), guild_id, signal_rx));

        info!("🎵 Sesión creada para guild {} en canal {}", guild_id, voice_channel);
        self.events.emit(PlayerEvent::SessionCreated {
            guild_id,
            voice_channel,
        });

        let ticket = session.tasks.acquire().await;
        let enqueue_result = {
            let mut queue = session.queue.lock();
            queue.arrange_enqueue(tracks)
        };
        if let Err(e) = enqueue_result {
            self.destroy(&session, &ticket, true, None).await;
            return Err(e);
        }
        self.play_front(&session, &ticket, true).await;
        Ok(())
    }

    /// Añade pistas a la cola; si la sesión estaba ociosa, arranca.
    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        tracks: Vec<Track>,
    ) -> Result<usize, PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let first = tracks.first().cloned();
        let (added, start) = {
            let mut queue = session.queue.lock();
            let was_empty = queue.items.is_empty();
            let added = queue.arrange_enqueue(tracks)?;
            (added, was_empty)
        };
        if let Some(track) = first {
            info!("➕ {} pista(s) en cola de guild {}", added, guild_id);
            self.events.emit(PlayerEvent::ItemAdded {
                guild_id,
                channel: session.text_channel(),
                track,
                count: added,
            });
        }
        if start {
            self.play_front(&session, &ticket, true).await;
        }
        Ok(added)
    }

    /// Salta a la siguiente pista; con autoplay y cola corta busca antes una
    /// continuación, y sin nada que seguir falla sin tocar la cola.
    pub async fn skip(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let continuation_seed = {
            let queue = session.queue.lock();
            if queue.items.len() > 1 {
                None
            } else if queue.autoplay {
                match queue.current() {
                    Some(current) => Some((current.clone(), queue.exclusion_ids())),
                    None => return Err(PlayerError::NoUpNext),
                }
            } else {
                return Err(PlayerError::NoUpNext);
            }
        };

        if let Some((seed, exclude)) = continuation_seed {
            let related = find_continuation(self.resolver.as_ref(), &seed, &exclude).await?;
            session.queue.lock().items.push_back(related);
        }

        {
            let mut queue = session.queue.lock();
            queue.arrange_skip()?;
            queue.pending = Some(AdvanceReason::Manual(Direction::Forward));
        }
        debug!("⏭️ Salto manual en guild {}", guild_id);
        if !session.voice.stop_current() {
            session.queue.lock().pending = None;
            self.play_front(&session, &ticket, true).await;
        }
        Ok(())
    }

    /// Vuelve a la pista anterior; la actual queda como siguiente.
    pub async fn previous(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        {
            let mut queue = session.queue.lock();
            queue.arrange_previous()?;
            queue.pending = Some(AdvanceReason::Manual(Direction::Back));
        }
        debug!("⏮️ Retroceso manual en guild {}", guild_id);
        if !session.voice.stop_current() {
            session.queue.lock().pending = None;
            self.play_front(&session, &ticket, true).await;
        }
        Ok(())
    }

    /// Salta a una posición 1-based de la cola, o negativa hacia el historial.
    pub async fn jump(&self, guild_id: GuildId, position: i64) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let direction = if position >= 0 {
            Direction::Forward
        } else {
            Direction::Back
        };
        {
            let mut queue = session.queue.lock();
            queue.arrange_jump(position)?;
            queue.pending = Some(AdvanceReason::Manual(direction));
        }
        debug!("⏭️ Salto a la posición {} en guild {}", position, guild_id);
        if !session.voice.stop_current() {
            session.queue.lock().pending = None;
            self.play_front(&session, &ticket, true).await;
        }
        Ok(())
    }

    /// Baraja la cola sin mover la pista actual; devuelve cuántas quedaron.
    pub async fn shuffle(&self, guild_id: GuildId) -> Result<usize, PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let mut queue = session.queue.lock();
        queue.shuffle_upcoming();
        let upcoming = queue.items.len().saturating_sub(1);
        debug!("🔀 Cola barajada en guild {} ({} pistas)", guild_id, upcoming);
        Ok(upcoming)
    }

    /// Reinicia la pista actual en la posición pedida.
    pub async fn seek(&self, guild_id: GuildId, position: Duration) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let current = session
            .queue
            .lock()
            .current()
            .cloned()
            .ok_or(PlayerError::NothingPlaying)?;
        match current.duration {
            Some(duration) if !current.live => {
                if position >= duration {
                    return Err(PlayerError::InvalidSeek {
                        requested: position,
                        duration: Some(duration),
                    });
                }
            }
            _ => {
                return Err(PlayerError::InvalidSeek {
                    requested: position,
                    duration: None,
                });
            }
        }
        debug!("⏩ Búsqueda a {:?} en guild {}", position, guild_id);
        self.restart_current_at(&session, &ticket, position).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        if !session.voice.pause() {
            return Err(PlayerError::NothingPlaying);
        }
        debug!("⏸️ Pausa en guild {}", guild_id);
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        if !session.voice.unpause() {
            return Err(PlayerError::NothingPlaying);
        }
        debug!("▶️ Reanudado en guild {}", guild_id);
        Ok(())
    }

    pub async fn set_volume(&self, guild_id: GuildId, volume: f32) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        session.voice.set_volume(volume)?;
        info!("🔊 Volumen de guild {} a {:.0}%", guild_id, volume * 100.0);
        Ok(())
    }

    /// Sin modo avanza el ciclo; repetir el modo activo lo apaga.
    pub async fn set_repeat(
        &self,
        guild_id: GuildId,
        mode: Option<RepeatMode>,
    ) -> Result<RepeatMode, PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        let new_mode = session.queue.lock().set_repeat(mode);
        info!("🔄 Repetición de guild {}: {}", guild_id, new_mode.label());
        Ok(new_mode)
    }

    pub async fn toggle_autoplay(&self, guild_id: GuildId) -> Result<bool, PlayerError> {
        let session = self.required(guild_id)?;
        let _ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        let enabled = {
            let mut queue = session.queue.lock();
            queue.autoplay = !queue.autoplay;
            queue.autoplay
        };
        info!(
            "📻 Autoplay de guild {}: {}",
            guild_id,
            if enabled { "activado" } else { "desactivado" }
        );
        Ok(enabled)
    }

    /// Activa un filtro y reinicia la pista actual donde iba.
    pub async fn add_filter(
        &self,
        guild_id: GuildId,
        name: &str,
        spec: &str,
    ) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let previous = session.filters.lock().clone();
        session.filters.lock().add(name, spec, false)?;
        self.reapply_filters(&session, &ticket, previous).await
    }

    pub async fn remove_filter(&self, guild_id: GuildId, name: &str) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let previous = session.filters.lock().clone();
        session.filters.lock().remove(name)?;
        self.reapply_filters(&session, &ticket, previous).await
    }

    /// Quita todos los filtros; devuelve si había alguno.
    pub async fn clear_filters(&self, guild_id: GuildId) -> Result<bool, PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;

        let previous = session.filters.lock().clone();
        let changed = session.filters.lock().clear();
        if changed {
            self.reapply_filters(&session, &ticket, previous).await?;
        }
        Ok(changed)
    }

    /// Detiene la reproducción y desmonta la sesión; según la política,
    /// además abandona el canal de voz.
    pub async fn stop(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        self.destroy(&session, &ticket, session.opts.leave_on_stop, None)
            .await;
        Ok(())
    }

    /// Desmonta la sesión y abandona el canal de voz.
    pub async fn leave(&self, guild_id: GuildId) -> Result<(), PlayerError> {
        let session = self.required(guild_id)?;
        let ticket = session.tasks.acquire().await;
        self.ensure_live(&session)?;
        self.destroy(&session, &ticket, true, None).await;
        Ok(())
    }

    /// Registra un traslado de canal observado por el gateway.
    pub fn note_moved(&self, guild_id: GuildId, channel_id: ChannelId) {
        if let Some(session) = self.get(guild_id) {
            session.voice.note_moved(channel_id);
        }
    }

    /// Cierra todas las sesiones activas en paralelo.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<PlaybackSession>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        if sessions.is_empty() {
            return;
        }
        info!("👋 Cerrando {} sesión(es) activa(s)", sessions.len());
        let closing = sessions.iter().map(|session| async {
            let ticket = session.tasks.acquire().await;
            self.destroy(session, &ticket, true, None).await;
        });
        futures::future::join_all(closing).await;
    }

    async fn run_signal_loop(
        manager: Arc<Self>,
        guild_id: GuildId,
        mut rx: mpsc::UnboundedReceiver<VoiceSignal>,
    ) {
        while let Some(signal) = rx.recv().await {
            match signal {
                VoiceSignal::Finished { resource } => {
                    manager.handle_finished(guild_id, resource).await;
                }
                VoiceSignal::Errored { resource, message } => {
                    manager.handle_errored(guild_id, resource, message).await;
                }
                VoiceSignal::Terminated { reason } => {
                    manager.handle_terminated(guild_id, reason).await;
                    break;
                }
            }
        }
        debug!("📡 Bucle de señales cerrado para guild {}", guild_id);
    }

    /// Fin de un recurso: decide entre el avance natural completo y el
    /// remate de una operación manual que ya dejó la cola ordenada.
    async fn handle_finished(&self, guild_id: GuildId, resource: u64) {
        let Some(session) = self.get(guild_id) else {
            return;
        };
        let ticket = session.tasks.acquire().await;

        if session.voice.current_resource_id() != Some(resource) {
            debug!("Señal de fin obsoleta ({}) en guild {}", resource, guild_id);
            return;
        }
        let pending = {
            let mut queue = session.queue.lock();
            if queue.stopped {
                return;
            }
            queue.pending.take().unwrap_or(AdvanceReason::Natural)
        };

        match pending {
            AdvanceReason::Manual(direction) => {
                debug!("Avance manual ({:?}) en guild {}", direction, guild_id);
                self.play_front(&session, &ticket, true).await;
            }
            AdvanceReason::Natural => {
                self.advance_natural(&session, &ticket).await;
            }
        }
    }

    /// Avance natural: repetición, autoplay, historial y desmontaje.
    ///
    /// La decisión sobre la cola vive en `QueueState::arrange_natural`;
    /// aquí solo se ejecuta el paso que esa fase indique.
    async fn advance_natural(&self, session: &Arc<PlaybackSession>, ticket: &TaskGuard) {
        let guild_id = session.guild_id();

        let step = session.queue.lock().arrange_natural();
        let (finished, continuation) = match step {
            NaturalStep::Teardown => {
                self.destroy(session, ticket, session.opts.leave_on_finish, None)
                    .await;
                return;
            }
            NaturalStep::Replay(finished) => {
                self.events.emit(PlayerEvent::Finished {
                    guild_id,
                    track: finished,
                });
                // La misma pista desde cero, sin anunciar de nuevo.
                debug!("🔄 Repitiendo pista en guild {}", guild_id);
                if let Err(e) = self.restart_current_at(session, ticket, Duration::ZERO).await {
                    warn!("❌ Falló la repetición en guild {}: {}", guild_id, e);
                    self.drop_front(session);
                    self.play_front(session, ticket, true).await;
                }
                return;
            }
            NaturalStep::Advance(finished) => (finished, None),
            NaturalStep::Continuation { finished, exclude } => (finished, Some(exclude)),
        };

        self.events.emit(PlayerEvent::Finished {
            guild_id,
            track: finished.clone(),
        });

        if let Some(exclude) = continuation {
            match find_continuation(self.resolver.as_ref(), &finished, &exclude).await {
                Ok(next) => {
                    info!("📻 Autoplay añade {} en guild {}", next.title, guild_id);
                    session.queue.lock().items.push_back(next);
                }
                Err(_) => {
                    self.events.emit(PlayerEvent::NoRelated {
                        guild_id,
                        channel: session.text_channel(),
                    });
                }
            }
        }

        if session.queue.lock().finish_front() {
            self.play_front(session, ticket, true).await;
        } else {
            info!("🏁 Cola agotada en guild {}", guild_id);
            self.destroy(session, ticket, session.opts.leave_on_finish, None)
                .await;
        }
    }

    /// Fallo del recurso vivo: descarta la pista culpable y sigue.
    async fn handle_errored(&self, guild_id: GuildId, resource: u64, message: String) {
        let Some(session) = self.get(guild_id) else {
            return;
        };
        let ticket = session.tasks.acquire().await;

        if session.voice.current_resource_id() != Some(resource) {
            debug!("Señal de error obsoleta ({}) en guild {}", resource, guild_id);
            return;
        }
        let pending = {
            let mut queue = session.queue.lock();
            if queue.stopped {
                return;
            }
            queue.pending.take().unwrap_or(AdvanceReason::Natural)
        };

        // Tras una orden manual la cola ya está ordenada y el frente actual
        // no es la pista que falló; no hay nada que descartar.
        if matches!(pending, AdvanceReason::Natural) {
            let failed = session.queue.lock().current().cloned();
            if let Some(failed) = failed {
                self.events.emit(PlayerEvent::PlaybackError {
                    guild_id,
                    channel: session.text_channel(),
                    track: failed,
                    error: message,
                });
            }
            self.drop_front(&session);
        }
        self.play_front(&session, &ticket, true).await;
    }

    /// Conexión perdida sin remedio: desmontar y avisar.
    async fn handle_terminated(&self, guild_id: GuildId, reason: Option<String>) {
        let Some(session) = self.get(guild_id) else {
            return;
        };
        let ticket = session.tasks.acquire().await;
        if let Some(reason) = &reason {
            warn!("🔌 Sesión de guild {} terminada: {}", guild_id, reason);
        }
        self.destroy(&session, &ticket, true, reason).await;
    }

    /// Reproduce `items[0]`, descartando pistas irreproducibles hasta que
    /// alguna arranque; si la cola se agota en el intento, desmonta.
    async fn play_front(
        &self,
        session: &Arc<PlaybackSession>,
        ticket: &TaskGuard,
        announce: bool,
    ) {
        let guild_id = session.guild_id();
        loop {
            let Some(mut track) = session.queue.lock().current().cloned() else {
                self.destroy(session, ticket, session.opts.leave_on_finish, None)
                    .await;
                return;
            };
            let filters = session.filters.lock().to_argument();

            if !track.has_stream() {
                if let Err(e) = self.resolver.attach_stream_info(&mut track).await {
                    warn!("❌ No se pudo resolver el stream de {}: {}", track.title, e);
                    self.events.emit(PlayerEvent::PlaybackError {
                        guild_id,
                        channel: session.text_channel(),
                        track: track.clone(),
                        error: e.to_string(),
                    });
                    self.drop_front(session);
                    continue;
                }
                if let Some(front) = session.queue.lock().items.front_mut() {
                    front.stream_url = track.stream_url.clone();
                }
            }

            match self
                .factory
                .create(&track, Duration::ZERO, filters.as_deref())
                .await
            {
                Ok(input) => {
                    session.voice.play(input).await;
                    session.offset.reset();
                    info!("▶️ Reproduciendo {} en guild {}", track.title, guild_id);
                    if announce {
                        self.events.emit(PlayerEvent::NowPlaying {
                            guild_id,
                            channel: session.text_channel(),
                            track,
                        });
                    }
                    return;
                }
                Err(e) => {
                    warn!("❌ No se pudo crear el recurso de {}: {}", track.title, e);
                    self.events.emit(PlayerEvent::PlaybackError {
                        guild_id,
                        channel: session.text_channel(),
                        track: track.clone(),
                        error: e.to_string(),
                    });
                    self.drop_front(session);
                }
            }
        }
    }

    /// Reinicia la pista actual en `offset` con la cadena de filtros vigente.
    ///
    /// El recurso nuevo se construye antes de tocar el vivo; si falla, la
    /// reproducción en curso queda intacta.
    async fn restart_current_at(
        &self,
        session: &Arc<PlaybackSession>,
        _ticket: &TaskGuard,
        offset: Duration,
    ) -> Result<(), PlayerError> {
        let guild_id = session.guild_id();
        let Some(mut track) = session.queue.lock().current().cloned() else {
            return Err(PlayerError::NothingPlaying);
        };
        let filters = session.filters.lock().to_argument();
        let was_paused = session.voice.is_paused();

        if !track.has_stream() {
            if let Err(e) = self.resolver.attach_stream_info(&mut track).await {
                let error = e.to_string();
                self.events.emit(PlayerEvent::PlaybackError {
                    guild_id,
                    channel: session.text_channel(),
                    track: track.clone(),
                    error: error.clone(),
                });
                return Err(PlayerError::Resolve(error));
            }
            if let Some(front) = session.queue.lock().items.front_mut() {
                front.stream_url = track.stream_url.clone();
            }
        }

        let input = match self
            .factory
            .create(&track, offset, filters.as_deref())
            .await
        {
            Ok(input) => input,
            Err(e) => {
                let error = e.to_string();
                self.events.emit(PlayerEvent::PlaybackError {
                    guild_id,
                    channel: session.text_channel(),
                    track: track.clone(),
                    error: error.clone(),
                });
                return Err(PlayerError::Resource(error));
            }
        };

        session.voice.play(input).await;
        session.offset.rebase(offset);
        if was_paused {
            session.voice.pause();
        }
        debug!("🎛️ Pista reiniciada en {:?} para guild {}", offset, guild_id);
        Ok(())
    }

    /// Reintenta la pista actual con la cadena nueva; si no arranca,
    /// restaura la cadena anterior y el fallo sube como error de reproducción.
    async fn reapply_filters(
        &self,
        session: &Arc<PlaybackSession>,
        ticket: &TaskGuard,
        previous: FilterChain,
    ) -> Result<(), PlayerError> {
        if session.queue.lock().current().is_none() {
            // Nada sonando: la cadena queda lista para la próxima pista.
            return Ok(());
        }
        // Posición absoluta en la pista, no la del recurso vivo: tras un
        // seek el reloj del driver ya no cuenta desde el comienzo.
        let offset = session.elapsed().await;
        match self.restart_current_at(session, ticket, offset).await {
            Ok(()) => Ok(()),
            Err(e) => {
                *session.filters.lock() = previous;
                Err(e)
            }
        }
    }

    fn drop_front(&self, session: &PlaybackSession) {
        let mut queue = session.queue.lock();
        if let Some(broken) = queue.items.pop_front() {
            queue.archive(broken);
        }
    }

    /// Desmonta una sesión exactamente una vez; quien llega tarde no repite
    /// ni las señales ni la salida del canal.
    async fn destroy(
        &self,
        session: &Arc<PlaybackSession>,
        _ticket: &TaskGuard,
        leave: bool,
        reason: Option<String>,
    ) {
        let already = {
            let mut queue = session.queue.lock();
            let already = queue.stopped;
            queue.stopped = true;
            queue.items.clear();
            queue.pending = None;
            already
        };
        if already {
            return;
        }

        let guild_id = session.guild_id();
        self.sessions.remove(&guild_id);

        if leave {
            session.voice.leave().await;
            self.events.emit(PlayerEvent::Disconnected {
                guild_id,
                channel: session.text_channel(),
                reason,
            });
        } else {
            session.voice.halt();
        }
        self.events.emit(PlayerEvent::SessionDeleted {
            guild_id,
            channel: session.text_channel(),
        });
        info!("🗑️ Sesión de guild {} destruida", guild_id);
    }
}
