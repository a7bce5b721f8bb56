use crate::error::SaveError;
use crate::save::{SAVE_KEY, SaveData, SaveStorage};

use super::GameEngine;

impl GameEngine {
    /// Versioned JSON snapshot of the whole state
    pub fn export_save(&self) -> Result<String, SaveError> {
        let data = SaveData::capture(&self.state, self.clock.now_ms());
        Ok(serde_json::to_string(&data)?)
    }

    /// Replace the state with an exported save. On error nothing changes.
    ///
    /// The next `update()` credits the time between the save's timestamp and
    /// now as offline progress.
    pub fn try_import_save(&mut self, json: &str) -> Result<(), SaveError> {
        let data = SaveData::parse(json)?;
        let now = self.clock.now_ms();
        let saved_at = data.timestamp.min(now);

        self.state = data.restore();
        self.last_update_ms = saved_at;
        self.invalidate_effects();
        self.autospawn();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "import",
            settlements = self.state.settlements.len() as u64,
            offline_secs = (now - saved_at) / 1000.0,
        );
        Ok(())
    }

    pub fn import_save(&mut self, json: &str) -> bool {
        match self.try_import_save(json) {
            Ok(()) => true,
            Err(_err) => {
                #[cfg(feature = "instrument")]
                tracing::warn!(target: "import", error = %_err, "save rejected");
                false
            }
        }
    }

    pub fn try_save(&self, storage: &mut dyn SaveStorage) -> Result<(), SaveError> {
        let json = self.export_save()?;
        storage.write(SAVE_KEY, &json)
    }

    pub fn save(&self, storage: &mut dyn SaveStorage) -> bool {
        self.try_save(storage).is_ok()
    }

    pub fn try_load(&mut self, storage: &dyn SaveStorage) -> Result<(), SaveError> {
        let json = storage
            .read(SAVE_KEY)?
            .ok_or_else(|| SaveError::NotFound(SAVE_KEY.to_string()))?;
        self.try_import_save(&json)
    }

    pub fn load(&mut self, storage: &dyn SaveStorage) -> bool {
        match self.try_load(storage) {
            Ok(()) => true,
            Err(_err) => {
                #[cfg(feature = "instrument")]
                tracing::warn!(target: "load", error = %_err, "load failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::engine_at;
    use crate::save::MemoryStorage;
    use crate::types::Tier;

    #[test]
    fn test_save_then_load_restores_state() {
        let (mut engine, _) = engine_at(11);
        let id = engine.state().settlements[0].id.clone();
        engine.buy_building(&id, "hamlet_hut");
        let mut storage = MemoryStorage::new();
        assert!(engine.save(&mut storage));

        let (mut other, other_clock) = engine_at(99);
        other_clock.advance_secs(30.0);
        assert!(other.load(&storage));
        assert_eq!(other.state().settlements, engine.state().settlements);

        // Time since the save is credited on the next update
        other.update();
        let s = other.settlement(&id).unwrap();
        assert!((s.currency - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_without_save_fails() {
        let (mut engine, _) = engine_at(11);
        assert!(!engine.load(&MemoryStorage::new()));
    }

    #[test]
    fn test_rejected_import_leaves_state_untouched() {
        let (mut engine, _) = engine_at(11);
        let before = engine.state().settlements.clone();
        assert!(!engine.import_save("garbage"));
        assert!(!engine.import_save(r#"{"version":"0.0.1"}"#));

        let json = engine.export_save().unwrap();
        let tampered = json.replace("\"hamlet_hut\"", "\"hamlet_castle\"");
        assert!(!engine.import_save(&tampered));
        assert_eq!(engine.state().settlements, before);
        assert!(engine.state().is_unlocked(Tier::Hamlet));
    }
}
