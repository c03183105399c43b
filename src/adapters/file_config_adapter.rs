//! INI file configuration adapter.

use crate::domain::error::SectorlsError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    /// A missing file is an I/O error; a malformed one is a parse error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SectorlsError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SectorlsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file '{}' not found", path.display()),
            )));
        }
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SectorlsError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
