//! Tracing setup helpers.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber reading `RUST_LOG`, defaulting
/// to `info`. Returns false if a subscriber was already installed.
pub fn try_init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_idempotent() {
        // First call may or may not win the race with other tests; the
        // second call must report that a subscriber already exists.
        let _ = try_init_tracing();
        assert!(!try_init_tracing());
    }
}
