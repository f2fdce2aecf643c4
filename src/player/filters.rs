use crate::player::error::PlayerError;
use tracing::{debug, info};

/// Presets con nombre, en sintaxis de filtro de ffmpeg.
///
/// La cadena acepta cualquier par nombre/especificación; esta tabla solo es
/// el vocabulario que expone el comando `/filter`.
const PRESETS: &[(&str, &str)] = &[
    ("bassboost", "bass=g=10"),
    ("nightcore", "asetrate=48000*1.25,aresample=48000,bass=g=5"),
    ("vaporwave", "asetrate=48000*0.8,aresample=48000,atempo=1.1"),
    ("karaoke", "stereotools=mlev=0.1"),
    ("8d", "apulsator=hz=0.125"),
    ("tremolo", "tremolo"),
    ("vibrato", "vibrato=f=6.5"),
    ("echo", "aecho=0.8:0.9:1000:0.3"),
    ("flanger", "flanger"),
    ("phaser", "aphaser"),
];

/// Busca la especificación de un preset por nombre.
pub fn preset(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(preset_name, _)| *preset_name == name)
        .map(|(_, spec)| *spec)
}

/// Nombres de preset disponibles, para autocompletado y ayuda.
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|(name, _)| *name).collect()
}

/// Cadena ordenada de transformaciones de audio activas en una sesión.
///
/// El orden de inserción importa: `to_argument()` concatena las
/// especificaciones en ese orden para armar el `-af` de ffmpeg. Toda
/// mutación se hace a través de la sesión dueña, que reinicia la pista
/// actual en su posición transcurrida con la lista nueva.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<(String, String)>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Agrega un filtro; con `overwrite` reemplaza la especificación en su
    /// posición original si el nombre ya existe.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        spec: impl Into<String>,
        overwrite: bool,
    ) -> Result<(), PlayerError> {
        let name = name.into();
        let spec = spec.into();

        if let Some(existing) = self.filters.iter_mut().find(|(n, _)| *n == name) {
            if !overwrite {
                return Err(PlayerError::FilterExists(name));
            }
            existing.1 = spec;
            debug!("🎛️ Filtro reemplazado: {}", name);
            return Ok(());
        }

        info!("🎛️ Filtro agregado: {}", name);
        self.filters.push((name, spec));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), PlayerError> {
        let before = self.filters.len();
        self.filters.retain(|(n, _)| n != name);
        if self.filters.len() == before {
            return Err(PlayerError::NoSuchFilter(name.to_string()));
        }
        info!("🎛️ Filtro eliminado: {}", name);
        Ok(())
    }

    /// Reemplaza la cadena completa conservando el orden recibido.
    #[allow(dead_code)]
    pub fn set(&mut self, pairs: Vec<(String, String)>) {
        self.filters = pairs;
        info!("🎛️ Cadena de filtros reemplazada ({})", self.filters.len());
    }

    /// Vacía la cadena; devuelve si había algo que limpiar.
    pub fn clear(&mut self) -> bool {
        let had_any = !self.filters.is_empty();
        self.filters.clear();
        if had_any {
            info!("🎛️ Filtros limpiados");
        }
        had_any
    }

    pub fn has(&self, name: &str) -> bool {
        self.filters.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.filters.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Especificaciones activas, en orden de inserción.
    #[allow(dead_code)]
    pub fn values(&self) -> Vec<&str> {
        self.filters.iter().map(|(_, spec)| spec.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Lista de argumentos para `-af`, o `None` con la cadena vacía.
    pub fn to_argument(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        Some(
            self.filters
                .iter()
                .map(|(_, spec)| spec.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_then_remove_restores_argument() {
        let mut chain = FilterChain::new();
        chain.add("bassboost", "bass=g=10", false).unwrap();
        let original = chain.to_argument();

        chain.add("tremolo", "tremolo", false).unwrap();
        assert_eq!(
            chain.to_argument().as_deref(),
            Some("bass=g=10,tremolo")
        );

        chain.remove("tremolo").unwrap();
        assert_eq!(chain.to_argument(), original);
    }

    #[test]
    fn test_duplicate_add_requires_overwrite() {
        let mut chain = FilterChain::new();
        chain.add("echo", "aecho=0.8:0.9:1000:0.3", false).unwrap();

        let err = chain.add("echo", "aecho=0.6:0.3:500:0.2", false);
        assert!(matches!(err, Err(PlayerError::FilterExists(_))));

        chain.add("echo", "aecho=0.6:0.3:500:0.2", true).unwrap();
        assert_eq!(chain.to_argument().as_deref(), Some("aecho=0.6:0.3:500:0.2"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_remove_missing_filter_fails() {
        let mut chain = FilterChain::new();
        assert!(matches!(
            chain.remove("nightcore"),
            Err(PlayerError::NoSuchFilter(_))
        ));
    }

    #[test]
    fn test_argument_preserves_insertion_order() {
        let mut chain = FilterChain::new();
        chain.add("nightcore", "asetrate=48000*1.25", false).unwrap();
        chain.add("bassboost", "bass=g=10", false).unwrap();
        chain.add("8d", "apulsator=hz=0.125", false).unwrap();

        assert_eq!(
            chain.to_argument().as_deref(),
            Some("asetrate=48000*1.25,bass=g=10,apulsator=hz=0.125")
        );
        assert_eq!(chain.names(), vec!["nightcore", "bassboost", "8d"]);
    }

    #[test]
    fn test_set_replaces_whole_chain() {
        let mut chain = FilterChain::new();
        chain.add("flanger", "flanger", false).unwrap();

        chain.set(vec![
            ("vibrato".to_string(), "vibrato=f=6.5".to_string()),
            ("phaser".to_string(), "aphaser".to_string()),
        ]);

        assert!(!chain.has("flanger"));
        assert_eq!(chain.to_argument().as_deref(), Some("vibrato=f=6.5,aphaser"));
    }

    #[test]
    fn test_clear_empties_chain() {
        let mut chain = FilterChain::new();
        assert!(!chain.clear());

        chain.add("karaoke", "stereotools=mlev=0.1", false).unwrap();
        assert!(chain.clear());
        assert!(chain.is_empty());
        assert_eq!(chain.to_argument(), None);
    }

    #[test]
    fn test_known_presets_resolve() {
        assert_eq!(preset("bassboost"), Some("bass=g=10"));
        assert!(preset("inexistente").is_none());
        assert!(preset_names().contains(&"nightcore"));
    }
}
