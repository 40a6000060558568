//! In-memory configuration service for tests.

use super::{Config, ConfigService};
use crate::Result;
use std::sync::Mutex;

/// Test configuration service holding a mutable in-memory [`Config`].
///
/// Unlike the production service it performs no I/O and no validation, so
/// tests can probe invalid-value handling explicitly.
pub struct TestConfigService {
    config: Mutex<Config>,
}

impl TestConfigService {
    /// Create a service wrapping the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Replace the entire configuration.
    pub fn set_config(&self, config: Config) {
        *self.config.lock().expect("test config lock") = config;
    }

    /// Mutate the configuration in place.
    pub fn update<F: FnOnce(&mut Config)>(&self, mutate: F) {
        let mut config = self.config.lock().expect("test config lock");
        mutate(&mut config);
    }

    /// Convenience: set the STT primary engine and API key.
    pub fn set_stt_engine_and_key(&self, primary: &str, api_key: &str) {
        self.update(|config| {
            config.stt.primary = primary.to_string();
            config.stt.whisper.api_key = Some(api_key.to_string());
        });
    }
}

impl Default for TestConfigService {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConfigService for TestConfigService {
    fn get_config(&self) -> Result<Config> {
        Ok(self.config.lock().expect("test config lock").clone())
    }

    fn reload(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_the_injected_config() {
        let service = TestConfigService::default();
        assert_eq!(service.get_config().unwrap().stt.primary, "whisper-large");

        service.update(|c| c.stt.primary = "whisper-base".into());
        assert_eq!(service.get_config().unwrap().stt.primary, "whisper-base");
    }

    #[test]
    fn helper_sets_engine_and_key() {
        let service = TestConfigService::default();
        service.set_stt_engine_and_key("whisper-base", "test-key");
        let config = service.get_config().unwrap();
        assert_eq!(config.stt.primary, "whisper-base");
        assert_eq!(config.stt.whisper.api_key.as_deref(), Some("test-key"));
    }
}
