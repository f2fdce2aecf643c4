use parking_lot::Mutex as SyncMutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::events::context_data::DisconnectReason;
use songbird::events::CoreEvent;
use songbird::model::CloseCode;
use songbird::tracks::TrackHandle;
use songbird::{
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::player::error::PlayerError;

/// Tiempo máximo para que el transporte quede listo al conectar.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Reintentos de reconexión antes de rendirse.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Base del backoff lineal: intento N espera N veces esto.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(5);
/// Espera tras un cierre de canal antes de decidir si fue un traslado.
const MOVE_GRACE: Duration = Duration::from_millis(1500);

/// Curva perceptual para la ganancia: el oído percibe el volumen en escala
/// logarítmica, así que 50% pedido no es 50% de amplitud.
pub fn perceptual_gain(volume: f32) -> f32 {
    volume.powf(1.660964)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Ready,
    Disconnected,
    Destroyed,
}

/// Clasificación de una caída del driver, reducida a lo que decide la
/// política de reconexión.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// La pedimos nosotros (leave o un intento superpuesto descartado).
    Requested,
    /// El servidor cerró el websocket de voz: traslado de canal o expulsión.
    ChannelClosed,
    /// Corte de red u otro fallo recuperable.
    Transient,
}

impl DisconnectCause {
    pub fn classify(reason: Option<&DisconnectReason>) -> Self {
        match reason {
            None
            | Some(DisconnectReason::Requested)
            | Some(DisconnectReason::AttemptDiscarded) => DisconnectCause::Requested,
            Some(DisconnectReason::WsClosed(Some(CloseCode::Disconnected))) => {
                DisconnectCause::ChannelClosed
            }
            Some(_) => DisconnectCause::Transient,
        }
    }
}

/// Qué hacer ante una caída, en función de la causa y los intentos previos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    Ignore,
    GraceThenCheck,
    RetryAfter(Duration),
    GiveUp,
}

pub fn next_reconnect_step(cause: DisconnectCause, attempts: u32) -> ReconnectStep {
    match cause {
        DisconnectCause::Requested => ReconnectStep::Ignore,
        DisconnectCause::ChannelClosed => ReconnectStep::GraceThenCheck,
        DisconnectCause::Transient => {
            if attempts >= MAX_RECONNECT_ATTEMPTS {
                ReconnectStep::GiveUp
            } else {
                ReconnectStep::RetryAfter(RECONNECT_BASE_DELAY * (attempts + 1))
            }
        }
    }
}

/// Una señal de fin solo avanza la cola si pertenece al recurso vivo y
/// este no reportó ya un error; todo lo demás es un eco de un recurso
/// reemplazado y se descarta.
fn end_signal_is_live(current: Option<(u64, bool)>, resource: u64) -> bool {
    matches!(current, Some((id, errored)) if id == resource && !errored)
}

/// Señales del transporte hacia el manejador de sesiones.
#[derive(Debug, Clone)]
pub enum VoiceSignal {
    /// El recurso terminó de sonar (fin natural o stop).
    Finished { resource: u64 },
    /// El recurso falló; una sola vez por recurso.
    Errored { resource: u64, message: String },
    /// La conexión murió de forma definitiva; la sesión debe desmontarse.
    Terminated { reason: Option<String> },
}

/// Señales internas del driver de songbird hacia el bucle de la sesión.
#[derive(Debug)]
enum DriverSignal {
    TrackEnded { resource: u64 },
    TrackErrored { resource: u64, message: String },
    Dropped(DisconnectCause),
    Established,
}

struct PlayingResource {
    handle: TrackHandle,
    id: u64,
    errored: bool,
}

struct VoiceState {
    status: ConnectionStatus,
    channel_id: ChannelId,
    reconnect_attempts: u32,
    volume: f32,
    next_resource_id: u64,
    current: Option<PlayingResource>,
    paused: bool,
    left: bool,
}

/// Dueña de la conexión de voz de una sesión.
///
/// Mantiene exactamente un recurso de audio vivo, numera cada recurso con un
/// id monótono para poder descartar señales viejas, y corre su propio bucle
/// de reconexión acotada. Las señales de ciclo de vida salen por el canal
/// entregado en [`VoiceSession::connect`]; el manejador de sesiones decide
/// qué hacer con ellas.
pub struct VoiceSession {
    guild_id: GuildId,
    songbird: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    state: SyncMutex<VoiceState>,
    signal_tx: mpsc::UnboundedSender<VoiceSignal>,
    driver_tx: mpsc::UnboundedSender<DriverSignal>,
    shutdown: CancellationToken,
}

impl VoiceSession {
    /// Conecta al canal de voz y deja instalados los handlers del driver.
    ///
    /// Devuelve la sesión y el receptor de señales de ciclo de vida. Si el
    /// transporte no queda listo dentro de [`CONNECT_TIMEOUT`] la conexión a
    /// medias se desmonta y se devuelve `ConnectTimeout`.
    pub async fn connect(
        songbird: Arc<Songbird>,
        guild_id: GuildId,
        channel_id: ChannelId,
        volume: f32,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<VoiceSignal>), PlayerError> {
        let call = match tokio::time::timeout(CONNECT_TIMEOUT, songbird.join(guild_id, channel_id))
            .await
        {
            Ok(Ok(call)) => call,
            Ok(Err(e)) => return Err(PlayerError::Join(e)),
            Err(_) => {
                let _ = songbird.remove(guild_id).await;
                return Err(PlayerError::ConnectTimeout);
            }
        };

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (driver_tx, driver_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            guild_id,
            songbird,
            call: call.clone(),
            state: SyncMutex::new(VoiceState {
                status: ConnectionStatus::Ready,
                channel_id,
                reconnect_attempts: 0,
                volume,
                next_resource_id: 0,
                current: None,
                paused: false,
                left: false,
            }),
            signal_tx,
            driver_tx: driver_tx.clone(),
            shutdown: CancellationToken::new(),
        });

        {
            let mut call_lock = call.lock().await;
            // El Call sobrevive a la sesión cuando halt() no sale del canal;
            // sin esta limpieza cada sesión nueva apilaría handlers viejos.
            call_lock.remove_all_global_events();
            call_lock.add_global_event(
                Event::Core(CoreEvent::DriverDisconnect),
                DriverHandler {
                    tx: driver_tx.clone(),
                },
            );
            call_lock.add_global_event(
                Event::Core(CoreEvent::DriverConnect),
                DriverHandler {
                    tx: driver_tx.clone(),
                },
            );
            call_lock.add_global_event(
                Event::Core(CoreEvent::DriverReconnect),
                DriverHandler { tx: driver_tx },
            );
        }

        tokio::spawn(Self::run_driver_loop(session.clone(), driver_rx));

        Ok((session, signal_rx))
    }

    /// Cuelga un recurso nuevo en la conexión y devuelve su id.
    ///
    /// Reemplaza al recurso vivo, reaplica el volumen guardado, registra los
    /// handlers de fin y de error con el id fresco y resetea el contador de
    /// reconexiones y el pestillo de error.
    pub async fn play(&self, input: songbird::input::Input) -> u64 {
        let previous = {
            let mut state = self.state.lock();
            state.current.take()
        };
        if let Some(previous) = previous {
            // Songbird mezcla pistas; el recurso anterior debe morir primero.
            let _ = previous.handle.stop();
        }

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let (resource, gain) = {
            let mut state = self.state.lock();
            state.next_resource_id += 1;
            state.reconnect_attempts = 0;
            state.paused = false;
            (state.next_resource_id, perceptual_gain(state.volume))
        };

        let _ = handle.set_volume(gain);

        if let Err(e) = handle.add_event(
            Event::Track(TrackEvent::End),
            TrackEndSignal {
                tx: self.driver_tx.clone(),
                resource,
            },
        ) {
            warn!("⚠️ No se pudo registrar el handler de fin: {}", e);
        }
        if let Err(e) = handle.add_event(
            Event::Track(TrackEvent::Error),
            TrackErrorSignal {
                tx: self.driver_tx.clone(),
                resource,
            },
        ) {
            warn!("⚠️ No se pudo registrar el handler de error: {}", e);
        }

        let mut state = self.state.lock();
        state.current = Some(PlayingResource {
            handle,
            id: resource,
            errored: false,
        });
        resource
    }

    /// Detiene el recurso vivo sin reemplazarlo; el fin llega como señal.
    pub fn stop_current(&self) -> bool {
        let state = self.state.lock();
        match &state.current {
            Some(current) => {
                let _ = current.handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        match &state.current {
            Some(current) => {
                let _ = current.handle.pause();
                state.paused = true;
                true
            }
            None => false,
        }
    }

    pub fn unpause(&self) -> bool {
        let mut state = self.state.lock();
        match &state.current {
            Some(current) => {
                let _ = current.handle.play();
                state.paused = false;
                true
            }
            None => false,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Fija el volumen lógico y lo aplica con la curva perceptual.
    pub fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        if !volume.is_finite() || volume < 0.0 {
            return Err(PlayerError::InvalidVolume(volume));
        }
        let mut state = self.state.lock();
        state.volume = volume;
        if let Some(current) = &state.current {
            let _ = current.handle.set_volume(perceptual_gain(volume));
        }
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    /// Posición del recurso vivo según el driver.
    pub async fn position(&self) -> Duration {
        let handle = {
            let state = self.state.lock();
            state.current.as_ref().map(|c| c.handle.clone())
        };
        match handle {
            Some(handle) => match handle.get_info().await {
                Ok(info) => info.position,
                Err(_) => Duration::ZERO,
            },
            None => Duration::ZERO,
        }
    }

    pub fn current_resource_id(&self) -> Option<u64> {
        self.state.lock().current.as_ref().map(|c| c.id)
    }

    #[allow(dead_code)]
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    pub fn channel(&self) -> ChannelId {
        self.state.lock().channel_id
    }

    /// Actualiza el canal tras un traslado observado por el gateway.
    pub fn note_moved(&self, channel_id: ChannelId) {
        let mut state = self.state.lock();
        if state.channel_id != channel_id {
            debug!(
                "🔀 Sesión de guild {} trasladada al canal {}",
                self.guild_id, channel_id
            );
            state.channel_id = channel_id;
        }
    }

    /// Corta la reproducción y el bucle del driver sin salir del canal.
    pub fn halt(&self) {
        let mut state = self.state.lock();
        if let Some(current) = state.current.take() {
            let _ = current.handle.stop();
        }
        state.status = ConnectionStatus::Destroyed;
        drop(state);
        self.shutdown.cancel();
    }

    /// Sale del canal de voz; idempotente, la segunda llamada no hace nada.
    pub async fn leave(&self) {
        let already_left = {
            let mut state = self.state.lock();
            let already = state.left;
            state.left = true;
            if let Some(current) = state.current.take() {
                let _ = current.handle.stop();
            }
            state.status = ConnectionStatus::Destroyed;
            already
        };
        self.shutdown.cancel();

        if !already_left {
            if let Err(e) = self.songbird.remove(self.guild_id).await {
                debug!(
                    "La conexión de guild {} ya estaba cerrada: {}",
                    self.guild_id, e
                );
            }
            info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        }
    }

    async fn run_driver_loop(session: Arc<Self>, mut rx: mpsc::UnboundedReceiver<DriverSignal>) {
        let shutdown = session.shutdown.clone();
        loop {
            let signal = tokio::select! {
                _ = shutdown.cancelled() => break,
                signal = rx.recv() => match signal {
                    Some(signal) => signal,
                    None => break,
                },
            };

            match signal {
                DriverSignal::TrackEnded { resource } => {
                    let forward = {
                        let state = session.state.lock();
                        end_signal_is_live(
                            state.current.as_ref().map(|c| (c.id, c.errored)),
                            resource,
                        )
                    };
                    if forward {
                        let _ = session.signal_tx.send(VoiceSignal::Finished { resource });
                    }
                }
                DriverSignal::TrackErrored { resource, message } => {
                    // Un recurso roto dispara error y fin; se reporta una vez.
                    let forward = {
                        let mut state = session.state.lock();
                        match &mut state.current {
                            Some(current) if current.id == resource && !current.errored => {
                                current.errored = true;
                                true
                            }
                            _ => false,
                        }
                    };
                    if forward {
                        warn!(
                            "❌ Recurso {} falló en guild {}: {}",
                            resource, session.guild_id, message
                        );
                        let _ = session
                            .signal_tx
                            .send(VoiceSignal::Errored { resource, message });
                    }
                }
                DriverSignal::Established => {
                    let mut state = session.state.lock();
                    if state.status != ConnectionStatus::Destroyed {
                        if state.reconnect_attempts > 0 {
                            info!("🔄 Reconectado al canal de voz en guild {}", session.guild_id);
                        }
                        state.status = ConnectionStatus::Ready;
                        state.reconnect_attempts = 0;
                    }
                }
                DriverSignal::Dropped(cause) => {
                    session.handle_drop(cause).await;
                }
            }
        }
        debug!(
            "🔌 Bucle del driver terminado para guild {}",
            session.guild_id
        );
    }

    async fn handle_drop(&self, cause: DisconnectCause) {
        let attempts = {
            let mut state = self.state.lock();
            if state.left || state.status == ConnectionStatus::Destroyed {
                return;
            }
            state.status = ConnectionStatus::Disconnected;
            state.reconnect_attempts
        };

        match next_reconnect_step(cause, attempts) {
            ReconnectStep::Ignore => {}
            ReconnectStep::GraceThenCheck => {
                debug!(
                    "🔀 Canal cerrado por el servidor en guild {}, esperando reubicación",
                    self.guild_id
                );
                tokio::select! {
                    _ = self.shutdown.cancelled() => return,
                    _ = tokio::time::sleep(MOVE_GRACE) => {}
                }
                let recovered = self.state.lock().status == ConnectionStatus::Ready;
                if !recovered {
                    info!("👋 Expulsado del canal de voz en guild {}", self.guild_id);
                    let _ = self.signal_tx.send(VoiceSignal::Terminated { reason: None });
                }
            }
            ReconnectStep::RetryAfter(delay) => {
                let attempt = {
                    let mut state = self.state.lock();
                    state.reconnect_attempts += 1;
                    state.reconnect_attempts
                };
                warn!(
                    "⚠️ Conexión de voz perdida en guild {}, reintento {}/{} en {:?}",
                    self.guild_id, attempt, MAX_RECONNECT_ATTEMPTS, delay
                );
                tokio::select! {
                    _ = self.shutdown.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }

                {
                    let mut state = self.state.lock();
                    if state.left || state.status == ConnectionStatus::Ready {
                        return;
                    }
                    state.status = ConnectionStatus::Connecting;
                }
                let channel = self.channel();
                if let Err(e) = self.songbird.join(self.guild_id, channel).await {
                    warn!(
                        "❌ Reintento de conexión falló en guild {}: {}",
                        self.guild_id, e
                    );
                    // Cuenta como la siguiente caída consecutiva.
                    let _ = self
                        .driver_tx
                        .send(DriverSignal::Dropped(DisconnectCause::Transient));
                }
                // En el éxito DriverConnect emite Established y resetea el contador.
            }
            ReconnectStep::GiveUp => {
                error!(
                    "❌ Reconexión agotada tras {} intentos en guild {}",
                    attempts, self.guild_id
                );
                let _ = self.signal_tx.send(VoiceSignal::Terminated {
                    reason: Some(PlayerError::ReconnectFailed(attempts).to_string()),
                });
            }
        }
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Reenvía el fin de un recurso concreto al bucle del driver.
struct TrackEndSignal {
    tx: mpsc::UnboundedSender<DriverSignal>,
    resource: u64,
}

#[async_trait::async_trait]
impl VoiceEventHandler for TrackEndSignal {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.tx.send(DriverSignal::TrackEnded {
            resource: self.resource,
        });
        None
    }
}

/// Reenvía el fallo de un recurso concreto al bucle del driver.
struct TrackErrorSignal {
    tx: mpsc::UnboundedSender<DriverSignal>,
    resource: u64,
}

#[async_trait::async_trait]
impl VoiceEventHandler for TrackErrorSignal {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                let _ = self.tx.send(DriverSignal::TrackErrored {
                    resource: self.resource,
                    message: format!("{:?}", state.playing),
                });
            }
        }
        None
    }
}

/// Observa las transiciones del driver y las reduce a señales internas.
struct DriverHandler {
    tx: mpsc::UnboundedSender<DriverSignal>,
}

#[async_trait::async_trait]
impl VoiceEventHandler for DriverHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverDisconnect(data) => {
                let cause = DisconnectCause::classify(data.reason.as_ref());
                let _ = self.tx.send(DriverSignal::Dropped(cause));
            }
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                let _ = self.tx.send(DriverSignal::Established);
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_separates_causes() {
        assert_eq!(DisconnectCause::classify(None), DisconnectCause::Requested);
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectReason::Requested)),
            DisconnectCause::Requested
        );
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectReason::Io)),
            DisconnectCause::Transient
        );
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectReason::TimedOut)),
            DisconnectCause::Transient
        );
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectReason::WsClosed(Some(
                CloseCode::Disconnected
            )))),
            DisconnectCause::ChannelClosed
        );
        assert_eq!(
            DisconnectCause::classify(Some(&DisconnectReason::WsClosed(None))),
            DisconnectCause::Transient
        );
    }

    #[test]
    fn test_end_signal_only_counts_for_live_resource() {
        // Señal del recurso vivo, sin error previo: avanza.
        assert!(end_signal_is_live(Some((7, false)), 7));
        // Id viejo: un stop ya reemplazó al recurso, el eco se descarta.
        assert!(!end_signal_is_live(Some((8, false)), 7));
        // El recurso ya reportó error; su fin no se reporta dos veces.
        assert!(!end_signal_is_live(Some((7, true)), 7));
        // Nada sonando.
        assert!(!end_signal_is_live(None, 7));
    }

    #[test]
    fn test_backoff_grows_linearly() {
        for attempts in 0..MAX_RECONNECT_ATTEMPTS {
            let step = next_reconnect_step(DisconnectCause::Transient, attempts);
            assert_eq!(
                step,
                ReconnectStep::RetryAfter(RECONNECT_BASE_DELAY * (attempts + 1))
            );
        }
    }

    #[test]
    fn test_sixth_disconnect_gives_up() {
        // Cinco caídas reintentan; la sexta ya no.
        assert_eq!(
            next_reconnect_step(DisconnectCause::Transient, MAX_RECONNECT_ATTEMPTS),
            ReconnectStep::GiveUp
        );
        assert_eq!(
            next_reconnect_step(DisconnectCause::Transient, MAX_RECONNECT_ATTEMPTS + 3),
            ReconnectStep::GiveUp
        );
    }

    #[test]
    fn test_requested_and_closed_causes_do_not_retry() {
        assert_eq!(
            next_reconnect_step(DisconnectCause::Requested, 0),
            ReconnectStep::Ignore
        );
        assert_eq!(
            next_reconnect_step(DisconnectCause::ChannelClosed, 4),
            ReconnectStep::GraceThenCheck
        );
    }

    #[test]
    fn test_perceptual_gain_anchors() {
        assert!((perceptual_gain(1.0) - 1.0).abs() < f32::EPSILON);
        assert_eq!(perceptual_gain(0.0), 0.0);
        // Por debajo del 100% la ganancia queda por debajo de la fracción pedida.
        assert!(perceptual_gain(0.5) < 0.5);
        // Monótona creciente.
        let mut last = 0.0;
        for step in 1..=20 {
            let gain = perceptual_gain(step as f32 / 10.0);
            assert!(gain > last);
            last = gain;
        }
    }
}
