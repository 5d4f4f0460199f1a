use std::sync::{Mutex, OnceLock};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn set_var(key: &str, value: Option<&str>) {
    // SAFETY: every caller holds `env_lock`, so no other test thread touches
    // the environment concurrently.
    unsafe {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}

/// Runs `run` with the given variables set (`Some`) or removed (`None`),
/// then restores their previous values. Environment-mutating tests are
/// serialized through one process-wide lock.
pub(crate) fn with_env<R>(vars: &[(&str, Option<&str>)], run: impl FnOnce() -> R) -> R {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
        .collect();
    for (key, value) in vars {
        set_var(key, *value);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(run));

    for (key, value) in &saved {
        set_var(key, value.as_deref());
    }
    match result {
        Ok(r) => r,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
