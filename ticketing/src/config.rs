use crate::error::TicketingError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use ticket_api::config::ApiClientConfiguration;

/// Application configuration struct
/// Holds the data we need to connect to the ticket service and to open the local store
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct AppConfiguration {
    pub server: ServerConfiguration,

    /// This will ensure that the filename is created, even if the Toml file
    /// does not have an `application_data` section
    #[serde(default = "default_application_data")]
    pub application_data: ApplicationData,
}

/// The `[server]` section: connection parameters plus the work timer autosave interval
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ServerConfiguration {
    #[serde(flatten)]
    pub api: ApiClientConfiguration,
    /// Seconds between two saves of the duration of a running work timer
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        ServerConfiguration {
            api: ApiClientConfiguration::default(),
            autosave_interval_secs: default_autosave_interval(),
        }
    }
}

/// Holds the configuration for the `application_data` section of the Toml file
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ApplicationData {
    /// The path to the local Sqlite store (cache, timers, session, settings)
    pub local_db: String,
}

impl Default for ApplicationData {
    fn default() -> Self {
        ApplicationData {
            local_db: local_db_file().to_string_lossy().to_string(),
        }
    }
}

/// Filename holding the application configuration parameters
#[must_use]
pub fn configuration_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("tickets.toml"),
        |dirs| dirs.preference_dir().join("tickets.toml"),
    )
}

/// Filename of the Sqlite DBMS holding the local store
#[must_use]
pub fn local_db_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("tickets.db"),
        |dirs| dirs.data_dir().join("tickets.db"),
    )
}

#[allow(clippy::missing_errors_doc)]
pub fn load() -> Result<AppConfiguration, TicketingError> {
    read(&configuration_file())
}

/// Loads the configuration file, or the defaults if there is none yet
#[allow(clippy::missing_errors_doc)]
pub fn load_or_default() -> Result<AppConfiguration, TicketingError> {
    let path = configuration_file();
    if path.exists() {
        read(&path)
    } else {
        Ok(AppConfiguration::default())
    }
}

#[allow(clippy::missing_errors_doc)]
pub fn save(cfg: &AppConfiguration) -> Result<()> {
    create_configuration_file(cfg, &configuration_file())
}

#[allow(clippy::missing_errors_doc)]
pub fn remove() -> io::Result<()> {
    fs::remove_file(configuration_file().as_path())
}

#[allow(clippy::missing_errors_doc)]
pub fn application_config_to_string(cfg: &AppConfiguration) -> Result<String> {
    Ok(toml::to_string::<AppConfiguration>(cfg)?)
}

fn default_application_data() -> ApplicationData {
    ApplicationData::default()
}

fn default_autosave_interval() -> u64 {
    30
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "helpdesk", "tickets")
}

/// Reads the `Application` configuration struct from the supplied TOML file
fn read(path: &Path) -> Result<AppConfiguration, TicketingError> {
    let mut file = File::open(path).map_err(|source| TicketingError::ApplicationConfig {
        path: path.into(),
        source,
    })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|source| TicketingError::ApplicationConfig {
            path: path.into(),
            source,
        })?;
    toml::from_str::<AppConfiguration>(&contents).map_err(|source| TicketingError::TomlParse {
        path: path.into(),
        source,
    })
}

fn create_configuration_file(cfg: &AppConfiguration, path: &Path) -> Result<()> {
    if let Some(directory) = path.parent() {
        if !directory.as_os_str().is_empty() && !directory.try_exists()? {
            fs::create_dir_all(directory)
                .with_context(|| format!("Unable to create {}", directory.display()))?;
        }
    }

    let mut file = File::create(path)?;
    let toml = application_config_to_string(cfg)?;
    file.write_all(toml.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_parsing() {
        let toml_str = r#"
        [server]
        url = "https://tickets.example.com"
        request_timeout_secs = 10
        autosave_interval_secs = 15

        [application_data]
        local_db = "tickets.db"
        "#;

        let app_config: AppConfiguration = toml::from_str(toml_str).unwrap();
        assert_eq!(app_config.server.api.url, "https://tickets.example.com");
        assert_eq!(app_config.server.api.request_timeout_secs, 10);
        assert_eq!(app_config.server.api.background_timeout_secs, 5);
        assert_eq!(app_config.server.autosave_interval_secs, 15);
        assert_eq!(app_config.application_data.local_db, "tickets.db");
    }

    /// Verifies that `local_db` is populated with a reasonable default even if it
    /// does not exist in the configuration file on disk
    #[test]
    fn test_toml_parsing_with_defaults_generated() {
        let toml_str = r#"
        [server]
        url = "http://localhost:8080"
        "#;

        let app_config: AppConfiguration = toml::from_str(toml_str).unwrap();
        assert_eq!(
            app_config.application_data.local_db,
            local_db_file().to_string_lossy()
        );
        assert_eq!(app_config.server.autosave_interval_secs, 30);
        assert_eq!(app_config.server.api.retry_attempts, 2);
    }

    #[test]
    fn test_write_and_read_toml_file() -> Result<()> {
        let tmp_config_file = std::env::temp_dir().join("tickets-test-config.toml");

        let mut cfg = AppConfiguration::default();
        cfg.server.api.url = "https://helpdesk.example.org".to_string();
        cfg.application_data.local_db = "tickets.db".to_string();

        create_configuration_file(&cfg, &tmp_config_file)?;
        let result = read(&tmp_config_file)?;
        assert_eq!(cfg, result);

        fs::remove_file(&tmp_config_file)?;
        Ok(())
    }
}
