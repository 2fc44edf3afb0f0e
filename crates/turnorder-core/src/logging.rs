#![forbid(unsafe_code)]

//! Log targets and subscriber setup.
//!
//! The engine logs through `tracing` under the `turnorder.*` targets below.
//! Libraries never install a subscriber; binaries and test harnesses do,
//! either their own or [`init_json_logging`] with the `tracing-json` feature.

/// Random-source diagnostics (fallback warnings).
pub const TARGET_RANDOM: &str = "turnorder.random";
/// Mode switches and persistence.
pub const TARGET_MODE: &str = "turnorder.mode";
/// Contact add/remove/rejection.
pub const TARGET_CONTACT: &str = "turnorder.contact";
/// Timer stages.
pub const TARGET_SCHEDULER: &str = "turnorder.scheduler";
/// Winner draws.
pub const TARGET_SELECTION: &str = "turnorder.selection";
/// Session lifecycle.
pub const TARGET_SESSION: &str = "turnorder.session";

/// All targets the engine emits under.
pub const ALL_TARGETS: [&str; 6] = [
    TARGET_RANDOM,
    TARGET_MODE,
    TARGET_CONTACT,
    TARGET_SCHEDULER,
    TARGET_SELECTION,
    TARGET_SESSION,
];

/// Install a global JSON subscriber filtered by `RUST_LOG`
/// (default `turnorder=info`).
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("turnorder=info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_share_prefix() {
        for target in ALL_TARGETS {
            assert!(target.starts_with("turnorder."), "{target}");
        }
    }
}
