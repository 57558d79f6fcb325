use crate::store::RepositoryError;
use std::sync::Arc;

pub const MEMBERSHIP_REGISTRATION_KEY: &str = "membership_registration_enabled";

/// Key/value persistence for runtime toggles.
pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;
    fn put(&self, key: &str, value: &str) -> Result<(), RepositoryError>;
}

/// Persisted switch that opens or closes direct member registration.
#[derive(Clone)]
pub struct MembershipGate {
    settings: Arc<dyn SettingsRepository>,
}

impl MembershipGate {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self { settings }
    }

    /// Registration is open unless explicitly switched off.
    pub fn is_open(&self) -> Result<bool, RepositoryError> {
        Ok(self
            .settings
            .get(MEMBERSHIP_REGISTRATION_KEY)?
            .map(|value| value != "false")
            .unwrap_or(true))
    }

    pub fn set_open(&self, enabled: bool) -> Result<(), RepositoryError> {
        self.settings
            .put(MEMBERSHIP_REGISTRATION_KEY, if enabled { "true" } else { "false" })?;
        tracing::info!(enabled, "membership registration toggled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn gate_defaults_open_and_persists_changes() {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
        let gate = MembershipGate::new(store.clone());
        assert!(gate.is_open().expect("read"));

        gate.set_open(false).expect("write");
        assert!(!gate.is_open().expect("read"));

        let reopened = MembershipGate::new(store);
        assert!(!reopened.is_open().expect("read"));
        reopened.set_open(true).expect("write");
        assert!(reopened.is_open().expect("read"));
    }
}
