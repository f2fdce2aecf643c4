use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info, warn};

mod bot;
mod config;
mod player;
mod sources;
mod storage;
mod ui;

use crate::bot::TocataBot;
use crate::config::Config;
use crate::player::{EventBus, SessionManager};
use crate::sources::{FfmpegFactory, ResourceFactory, TrackResolver, YtDlpResolver};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tocata=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Tocata v{}", env!("CARGO_PKG_VERSION"));

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check().await;
    }

    let config = Config::load()?;
    info!("{}", config.summary());

    // Dependencias externas: sin yt-dlp no hay nada que reproducir; sin
    // ffmpeg no hay seek ni filtros, pero la reproducción directa funciona.
    YtDlpResolver::verify().await?;
    if let Err(e) = FfmpegFactory::verify().await {
        warn!("⚠️ ffmpeg no disponible, seek y filtros quedarán inutilizables: {}", e);
    }

    let storage = Arc::new(tokio::sync::Mutex::new(
        JsonStorage::new(config.data_dir.clone()).await?,
    ));

    let resolver: Arc<dyn TrackResolver> =
        Arc::new(YtDlpResolver::new(config.max_playlist_size));
    let factory: Arc<dyn ResourceFactory> = Arc::new(FfmpegFactory::new()?);
    let events = EventBus::default();

    let songbird = Songbird::serenity();
    let manager = Arc::new(SessionManager::new(
        songbird.clone(),
        resolver.clone(),
        factory,
        events.clone(),
    ));

    // Solo guilds y estados de voz; este bot no lee mensajes.
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let token = config.discord_token.clone();
    let handler = TocataBot::new(Arc::new(config), storage, manager.clone(), resolver);

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // El anunciador convierte los eventos del reproductor en mensajes.
    tokio::spawn(bot::events::run_notifier(
        client.http.clone(),
        events.subscribe(),
    ));

    // Shutdown ordenado: cerrar las sesiones antes de morir.
    let shutdown_manager = manager.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Error al registrar Ctrl+C");
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shutdown_manager.shutdown().await;
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

/// Verificación rápida de dependencias para orquestadores de contenedores.
async fn health_check() -> Result<()> {
    let yt_dlp = async_process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await?;

    let ffmpeg = async_process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await?;

    if yt_dlp.status.success() && ffmpeg.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes");
    }
}
