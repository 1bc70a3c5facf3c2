use std::sync::Arc;

mod provider;
mod scripted;

pub use provider::{
    BackendConfig, BackendError, BackendEventStream, BackendResult, BackendStreamHandle,
    BackendWorker, ChatBackend, DEFAULT_CHUNK_DELAY,
};
pub use scripted::{SCRIPTED_BACKEND_ID, ScriptedBackend, ScriptedReply};

pub fn create_backend(mut config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    if config.backend_id.trim().is_empty() {
        config.backend_id = SCRIPTED_BACKEND_ID.to_string();
    }

    match config.backend_id.as_str() {
        SCRIPTED_BACKEND_ID => Ok(Arc::new(ScriptedBackend::from_config(&config)?)),
        _ => Err(BackendError::UnsupportedBackend {
            stage: "create-backend",
            backend_id: config.backend_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_id_selects_the_scripted_backend() {
        let backend = create_backend(BackendConfig::new("  ")).unwrap();
        assert_eq!(backend.id(), SCRIPTED_BACKEND_ID);
    }

    #[test]
    fn only_the_scripted_id_is_recognised() {
        let error = create_backend(BackendConfig::new("replay")).err().unwrap();
        assert!(matches!(error, BackendError::UnsupportedBackend { .. }));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let error = create_backend(BackendConfig::new("carrier-pigeon"))
            .err()
            .unwrap();
        assert!(matches!(
            error,
            BackendError::UnsupportedBackend { ref backend_id, .. } if backend_id == "carrier-pigeon"
        ));
    }
}
