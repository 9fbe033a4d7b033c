//! Settings environment isolation for integration tests.

use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SETTINGS_PREFIX: &str = "MIRRORSHIFT__";
const CONFIG_PATH_VAR: &str = "MIRRORSHIFT_CONFIG";

static SETTINGS_ENV: Mutex<()> = Mutex::new(());

/// Holds the process environment free of ambient settings overrides.
///
/// Every `MIRRORSHIFT__*` variable and `MIRRORSHIFT_CONFIG` is removed, the
/// requested overrides are applied, and the prior values come back on drop.
pub struct SettingsEnv {
    saved: Vec<(OsString, OsString)>,
    applied: Vec<OsString>,
    _serial: MutexGuard<'static, ()>,
}

impl SettingsEnv {
    /// Isolates the environment and applies `overrides`.
    pub fn isolate(overrides: &[(&str, &str)]) -> Self {
        let serial = SETTINGS_ENV.lock().unwrap_or_else(PoisonError::into_inner);
        let saved: Vec<(OsString, OsString)> = env::vars_os()
            .filter(|(key, _)| {
                key.to_str().is_some_and(|name| {
                    name.starts_with(SETTINGS_PREFIX) || name == CONFIG_PATH_VAR
                })
            })
            .collect();

        // SAFETY: SETTINGS_ENV serialises every environment mutation in these tests.
        unsafe {
            for (key, _) in &saved {
                env::remove_var(key);
            }
            for (key, value) in overrides {
                env::set_var(key, value);
            }
        }

        Self {
            saved,
            applied: overrides.iter().map(|(key, _)| OsString::from(key)).collect(),
            _serial: serial,
        }
    }
}

impl Drop for SettingsEnv {
    fn drop(&mut self) {
        // SAFETY: the guard still holds SETTINGS_ENV.
        unsafe {
            for key in &self.applied {
                env::remove_var(key);
            }
            for (key, value) in &self.saved {
                env::set_var(key, value);
            }
        }
    }
}
