use anyhow::{Context, Result};
use async_trait::async_trait;
use songbird::input::{ChildContainer, HttpRequest, Input};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

use super::ResourceFactory;
use crate::player::track::Track;

/// Fábrica de inputs de audio.
///
/// Sin offset ni filtros el stream viaja directo por HTTP y songbird lo
/// decodifica. Con cualquiera de los dos se interpone un proceso ffmpeg
/// que aplica el recorte y la cadena de filtros, emitiendo WAV por stdout.
pub struct FfmpegFactory {
    http: reqwest::Client,
}

impl FfmpegFactory {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Error al crear el cliente HTTP")?;
        Ok(Self { http })
    }

    /// Verifica que ffmpeg esté instalado y responda.
    pub async fn verify() -> Result<()> {
        let output = async_process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await
            .context("Error al ejecutar ffmpeg")?;
        if !output.status.success() {
            anyhow::bail!("ffmpeg no disponible");
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceFactory for FfmpegFactory {
    async fn create<'a>(&self, track: &Track, offset: Duration, filters: Option<&'a str>) -> Result<Input> {
        let stream = track
            .stream_url
            .as_deref()
            .with_context(|| format!("la pista no tiene URL de stream: {}", track.title))?;

        if offset.is_zero() && filters.is_none() {
            let request = HttpRequest::new(self.http.clone(), stream.to_string());
            return Ok(Input::from(request));
        }

        debug!(
            "🎛️ Lanzando ffmpeg para {} (offset: {:?}, filtros: {})",
            track.title,
            offset,
            filters.unwrap_or("ninguno")
        );
        let args = build_args(stream, offset, filters);
        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Error al lanzar ffmpeg")?;

        Ok(Input::from(ChildContainer::from(child)))
    }
}

/// Arma la línea de argumentos de ffmpeg.
///
/// El `-ss` va antes de `-i` para que el recorte sea sobre el demuxer y no
/// requiera decodificar todo el comienzo. La salida es WAV de 48 kHz estéreo,
/// el formato nativo del mezclador.
fn build_args(stream: &str, offset: Duration, filters: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if !offset.is_zero() {
        args.push("-ss".into());
        args.push(format!("{:.3}", offset.as_secs_f64()));
    }
    args.extend([
        "-reconnect".into(),
        "1".into(),
        "-reconnect_streamed".into(),
        "1".into(),
        "-reconnect_delay_max".into(),
        "5".into(),
        "-i".into(),
        stream.to_string(),
        "-vn".into(),
    ]);
    if let Some(chain) = filters {
        args.push("-af".into());
        args.push(chain.to_string());
    }
    args.extend([
        "-f".into(),
        "wav".into(),
        "-ar".into(),
        "48000".into(),
        "-ac".into(),
        "2".into(),
        "-loglevel".into(),
        "error".into(),
        "pipe:1".into(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_factory_builds_with_default_tls() {
        assert!(FfmpegFactory::new().is_ok());
    }

    #[test]
    fn test_args_with_offset_seek_before_input() {
        let args = build_args("https://cdn.example/a.webm", Duration::from_millis(12500), None);

        assert_eq!(args[0], "-ss");
        assert_eq!(args[1], "12.500");
        let seek = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(seek < input);
        assert!(!args.contains(&"-af".to_string()));
    }

    #[test]
    fn test_args_with_filters_only() {
        let args = build_args("https://cdn.example/a.webm", Duration::ZERO, Some("bass=g=10"));

        assert!(!args.contains(&"-ss".to_string()));
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], "bass=g=10");
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(input < af);
    }

    #[test]
    fn test_args_output_is_wav_on_stdout() {
        let args = build_args("https://cdn.example/a.webm", Duration::from_secs(3), Some("atempo=1.2"));

        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        let fmt = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[fmt + 1], "wav");
        assert!(args.contains(&"-vn".to_string()));
    }
}
