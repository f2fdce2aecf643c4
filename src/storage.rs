use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Preferencias de servidor almacenadas en JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub default_volume: f32,
    pub autoplay: bool,
    pub keep_history: bool,
    pub announcement_channel_id: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl GuildSettings {
    fn for_guild(guild_id: u64) -> Self {
        Self {
            guild_id,
            default_volume: 0.5,
            autoplay: false,
            keep_history: true,
            announcement_channel_id: None,
            updated_at: Utc::now(),
        }
    }
}

/// Almacenamiento basado en archivos JSON, uno por servidor
pub struct JsonStorage {
    data_dir: PathBuf,
    guilds_cache: HashMap<u64, GuildSettings>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).await?;

        let guilds_dir = data_dir.join("guilds");
        fs::create_dir_all(&guilds_dir).await?;

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let mut storage = Self {
            data_dir,
            guilds_cache: HashMap::new(),
        };

        storage.load_all_guilds().await?;

        Ok(storage)
    }

    /// Obtiene las preferencias de un servidor, creándolas si no existen
    pub async fn settings_for(&mut self, guild_id: u64) -> Result<GuildSettings> {
        if let Some(settings) = self.guilds_cache.get(&guild_id) {
            return Ok(settings.clone());
        }

        match self.load_guild_settings(guild_id).await {
            Ok(settings) => {
                self.guilds_cache.insert(guild_id, settings.clone());
                Ok(settings)
            }
            Err(_) => {
                let settings = GuildSettings::for_guild(guild_id);

                self.save_guild_settings(&settings).await?;
                self.guilds_cache.insert(guild_id, settings.clone());

                info!("📝 Preferencias por defecto creadas para guild {}", guild_id);
                Ok(settings)
            }
        }
    }

    /// Actualiza las preferencias de un servidor
    pub async fn update(&mut self, mut settings: GuildSettings) -> Result<()> {
        settings.updated_at = Utc::now();
        let guild_id = settings.guild_id;

        self.guilds_cache.insert(guild_id, settings.clone());
        self.save_guild_settings(&settings).await?;

        info!("💾 Preferencias actualizadas para guild {}", guild_id);
        Ok(())
    }

    /// Actualiza el volumen por defecto de un servidor
    pub async fn set_default_volume(&mut self, guild_id: u64, volume: f32) -> Result<()> {
        let mut settings = self.settings_for(guild_id).await?;
        settings.default_volume = volume.clamp(0.0, 2.0);
        self.update(settings).await
    }

    /// Activa o desactiva el autoplay por defecto de un servidor
    pub async fn set_autoplay(&mut self, guild_id: u64, enabled: bool) -> Result<()> {
        let mut settings = self.settings_for(guild_id).await?;
        settings.autoplay = enabled;
        self.update(settings).await
    }

    /// Activa o desactiva la retención de historial de un servidor
    pub async fn set_keep_history(&mut self, guild_id: u64, enabled: bool) -> Result<()> {
        let mut settings = self.settings_for(guild_id).await?;
        settings.keep_history = enabled;
        self.update(settings).await
    }

    /// Configura el canal de anuncios de un servidor
    pub async fn set_announcement_channel(
        &mut self,
        guild_id: u64,
        channel_id: Option<u64>,
    ) -> Result<()> {
        let mut settings = self.settings_for(guild_id).await?;
        settings.announcement_channel_id = channel_id;
        self.update(settings).await
    }

    // Métodos privados

    async fn load_guild_settings(&self, guild_id: u64) -> Result<GuildSettings> {
        let file_path = self.guild_file_path(guild_id);
        let content = fs::read_to_string(&file_path).await?;
        let settings: GuildSettings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Escribe a un archivo temporal y renombra encima del definitivo; un
    /// corte a mitad de escritura nunca deja un JSON truncado.
    async fn save_guild_settings(&self, settings: &GuildSettings) -> Result<()> {
        let file_path = self.guild_file_path(settings.guild_id);
        let tmp_path = file_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &file_path).await?;
        Ok(())
    }

    async fn load_all_guilds(&mut self) -> Result<()> {
        let guilds_dir = self.data_dir.join("guilds");

        if !guilds_dir.exists() {
            return Ok(());
        }

        let mut files = fs::read_dir(&guilds_dir).await?;
        let mut loaded_count = 0;

        while let Some(entry) = files.next_entry().await? {
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(file_name) = path.file_stem().and_then(|n| n.to_str()) {
                    if let Some(guild_id_str) = file_name.strip_prefix("guild_") {
                        if let Ok(guild_id) = guild_id_str.parse::<u64>() {
                            match self.load_guild_settings(guild_id).await {
                                Ok(settings) => {
                                    self.guilds_cache.insert(guild_id, settings);
                                    loaded_count += 1;
                                }
                                Err(e) => {
                                    warn!(
                                        "Error cargando preferencias para guild {}: {}",
                                        guild_id, e
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        if loaded_count > 0 {
            info!("📂 Cargadas {} preferencias de servidor", loaded_count);
        }

        Ok(())
    }

    fn guild_file_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir
            .join("guilds")
            .join(format!("guild_{}.json", guild_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        std::env::temp_dir().join(format!("tocata-{}-{}-{}", label, std::process::id(), nanos))
    }

    #[tokio::test]
    async fn test_settings_survive_reload() {
        let dir = scratch_dir("storage");

        {
            let mut storage = JsonStorage::new(dir.clone()).await.unwrap();
            let fresh = storage.settings_for(42).await.unwrap();
            assert_eq!(fresh.default_volume, 0.5);
            assert!(!fresh.autoplay);

            storage.set_default_volume(42, 0.8).await.unwrap();
            storage.set_autoplay(42, true).await.unwrap();
        }

        let mut reloaded = JsonStorage::new(dir.clone()).await.unwrap();
        let settings = reloaded.settings_for(42).await.unwrap();
        assert_eq!(settings.default_volume, 0.8);
        assert!(settings.autoplay);
        assert!(settings.keep_history);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_save_replaces_file_without_leaving_temp() {
        let dir = scratch_dir("atomic");

        let mut storage = JsonStorage::new(dir.clone()).await.unwrap();
        storage.set_default_volume(9, 0.7).await.unwrap();
        storage.set_default_volume(9, 0.9).await.unwrap();

        let path = dir.join("guilds").join("guild_9.json");
        assert!(path.exists());
        // El temporal de la escritura no sobrevive al renombrado.
        assert!(!path.with_extension("json.tmp").exists());

        // El definitivo queda parseable tras cada guardado.
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: GuildSettings = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.default_volume, 0.9);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_volume_is_clamped_on_save() {
        let dir = scratch_dir("clamp");

        let mut storage = JsonStorage::new(dir.clone()).await.unwrap();
        storage.set_default_volume(7, 9.0).await.unwrap();
        let settings = storage.settings_for(7).await.unwrap();
        assert_eq!(settings.default_volume, 2.0);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
