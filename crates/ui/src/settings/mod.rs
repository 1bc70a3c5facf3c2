pub mod state;

pub use state::{
    BackendSettings, ChatSettings, SettingsChanged, SettingsError, SettingsState, SettingsStore,
};
