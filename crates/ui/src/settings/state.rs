use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chatpane_backend::{BackendConfig, DEFAULT_CHUNK_DELAY, SCRIPTED_BACKEND_ID};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use gpui::*;
use gpui_component::{Theme, ThemeMode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_CUSTOMER_ID: &str = "guest";
pub const SETTINGS_DIRECTORY_NAME: &str = "chatpane";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
/// Environment overrides, nested keys separated by `__` (e.g. `CHATPANE_BACKEND__BACKEND_ID`).
pub const SETTINGS_ENV_PREFIX: &str = "CHATPANE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_id")]
    pub backend_id: String,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            backend_id: default_backend_id(),
            script_path: None,
            chunk_delay_ms: default_chunk_delay_ms(),
        }
    }
}

impl BackendSettings {
    fn normalized(mut self) -> Self {
        self.backend_id = if self.backend_id.trim().is_empty() {
            default_backend_id()
        } else {
            self.backend_id.trim().to_string()
        };
        self.script_path = self
            .script_path
            .filter(|path| !path.as_os_str().is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_customer_id")]
    pub customer_id: String,
    #[serde(
        default = "default_theme_mode",
        serialize_with = "serialize_theme_mode",
        deserialize_with = "deserialize_theme_mode"
    )]
    pub theme_mode: ThemeMode,
    #[serde(default = "default_smooth_scroll")]
    pub smooth_scroll: bool,
    #[serde(default)]
    pub backend: BackendSettings,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            customer_id: default_customer_id(),
            theme_mode: default_theme_mode(),
            smooth_scroll: default_smooth_scroll(),
            backend: BackendSettings::default(),
        }
    }
}

impl ChatSettings {
    pub fn normalized(mut self) -> Self {
        self.customer_id = if self.customer_id.trim().is_empty() {
            default_customer_id()
        } else {
            self.customer_id.trim().to_string()
        };
        self.backend = self.backend.normalized();
        self
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        let config = BackendConfig::new(&self.backend.backend_id)
            .with_chunk_delay(Duration::from_millis(self.backend.chunk_delay_ms));

        match &self.backend.script_path {
            Some(path) => config.with_script_path(path.clone()),
            None => config,
        }
    }

    pub fn with_toggled_theme(mut self) -> Self {
        self.theme_mode = if self.theme_mode.is_dark() {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        };
        self
    }

    pub fn apply_theme(&self, window: Option<&mut Window>, cx: &mut App) {
        Theme::change(self.theme_mode, window, cx);
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<ChatSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".chatpane"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = load_settings(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<ChatSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: ChatSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn persist(&self, settings: &ChatSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
        Ok(())
    }
}

/// Defaults, then the settings file, then `CHATPANE_*` environment overrides.
pub fn settings_figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(ChatSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(SETTINGS_ENV_PREFIX).split("__"))
}

fn load_settings(path: &Path) -> ChatSettings {
    if !path.exists() {
        tracing::info!(?path, "settings file not found, using defaults");
    }

    match settings_figment(path).extract::<ChatSettings>() {
        Ok(settings) => settings.normalized(),
        Err(error) => {
            tracing::warn!(?path, %error, "failed to parse settings, using defaults");
            ChatSettings::default()
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Entity wrapper so views can react to saved settings.
pub struct SettingsState {
    store: SettingsStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChanged {
    pub settings: ChatSettings,
}

impl EventEmitter<SettingsChanged> for SettingsState {}

impl SettingsState {
    pub fn new(cx: &mut App) -> Entity<Self> {
        cx.new(|_| Self {
            store: SettingsStore::load(),
        })
    }

    pub fn settings(&self) -> Arc<ChatSettings> {
        self.store.settings()
    }

    pub fn update_settings(
        &mut self,
        settings: ChatSettings,
        cx: &mut Context<Self>,
    ) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.store.update(normalized_settings.clone())?;
        cx.emit(SettingsChanged {
            settings: normalized_settings,
        });
        cx.notify();
        Ok(())
    }
}

fn default_customer_id() -> String {
    DEFAULT_CUSTOMER_ID.to_string()
}

fn default_backend_id() -> String {
    SCRIPTED_BACKEND_ID.to_string()
}

fn default_chunk_delay_ms() -> u64 {
    DEFAULT_CHUNK_DELAY.as_millis() as u64
}

fn default_smooth_scroll() -> bool {
    true
}

fn default_theme_mode() -> ThemeMode {
    ThemeMode::Light
}

fn serialize_theme_mode<S>(value: &ThemeMode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.name())
}

fn deserialize_theme_mode<'de, D>(deserializer: D) -> Result<ThemeMode, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(parse_theme_mode(&value))
}

fn parse_theme_mode(value: &str) -> ThemeMode {
    if value.trim().eq_ignore_ascii_case("dark") {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_without_file_or_environment() {
        Jail::expect_with(|_jail| {
            let settings = load_settings(Path::new("missing.json"));
            assert_eq!(settings, ChatSettings::default());
            assert_eq!(settings.customer_id, "guest");
            assert!(settings.smooth_scroll);
            assert_eq!(settings.backend.backend_id, "scripted");
            assert_eq!(settings.backend.chunk_delay_ms, 40);
            Ok(())
        });
    }

    #[test]
    fn file_and_environment_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{
                    "customer_id": "  c-42  ",
                    "theme_mode": "dark",
                    "backend": { "script_path": "replay.jsonl" }
                }"#,
            )?;
            jail.set_env("CHATPANE_SMOOTH_SCROLL", "false");
            jail.set_env("CHATPANE_BACKEND__CHUNK_DELAY_MS", "5");

            let settings = load_settings(Path::new("settings.json"));
            assert_eq!(settings.customer_id, "c-42");
            assert!(settings.theme_mode.is_dark());
            assert!(!settings.smooth_scroll);
            assert_eq!(settings.backend.backend_id, "scripted");
            assert_eq!(settings.backend.chunk_delay_ms, 5);

            let config = settings.to_backend_config();
            assert_eq!(config.backend_id, "scripted");
            assert_eq!(config.script_path, Some(PathBuf::from("replay.jsonl")));
            assert_eq!(config.chunk_delay, Duration::from_millis(5));
            Ok(())
        });
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", "{ not json")?;
            assert_eq!(
                load_settings(Path::new("settings.json")),
                ChatSettings::default()
            );
            Ok(())
        });
    }

    #[test]
    fn update_persists_and_swaps() {
        let dir = std::env::temp_dir().join(format!("chatpane-settings-{}", uuid::Uuid::new_v4()));
        let path = dir.join(SETTINGS_FILE_NAME);
        let store = SettingsStore::new(path.clone());

        let mut settings = ChatSettings::default().with_toggled_theme();
        settings.customer_id = " ".to_string();
        settings.backend.backend_id = "  scripted ".to_string();
        settings.backend.chunk_delay_ms = 5;
        store.update(settings).expect("settings should persist");

        let current = store.settings();
        assert!(current.theme_mode.is_dark());
        assert_eq!(current.customer_id, DEFAULT_CUSTOMER_ID);
        assert!(!path.with_extension("json.tmp").exists());

        let saved: ChatSettings =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("settings file"))
                .expect("saved settings should parse");
        assert_eq!(saved, *current);
        assert_eq!(saved.backend.backend_id, "scripted");
        assert_eq!(saved.backend.chunk_delay_ms, 5);

        std::fs::remove_dir_all(dir).ok();
    }
}
