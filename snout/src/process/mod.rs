//! External process supervision
//!
//! Capture hardware is driven through third-party command line tools. This
//! module starts them, relays their output line by line and stops them
//! again.

pub mod relay;
pub mod supervisor;

pub use relay::{Framing, IoRelay, ReadResult};
pub use supervisor::{
    CommandSpec, OutputStream, PipeMode, ProcessState, ProcessSupervisor, ReadMode,
    TerminationPolicy,
};

use std::collections::{BTreeMap, HashMap};

/// Merges a tool environment overlay into `current` and returns the
/// variables that must be set on the child.
///
/// Keys containing `PREFIX` replace the current value, keys containing
/// `PATH` are prepended with `:`, absent keys are added. Values identical
/// to the current ones are skipped.
pub fn overlay_environment(
    current: &HashMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for (key, value) in overlay {
        match current.get(key) {
            None => {
                merged.insert(key.clone(), value.clone());
            }
            Some(existing) if existing == value => {}
            Some(existing) => {
                if key.contains("PREFIX") {
                    merged.insert(key.clone(), value.clone());
                }
                if key.contains("PATH") {
                    let base = merged.get(key).unwrap_or(existing);
                    merged.insert(key.clone(), format!("{value}:{base}"));
                }
            }
        }
    }
    merged
}

/// [`overlay_environment`] against the environment of this process.
pub fn overlay_process_environment(overlay: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let current: HashMap<String, String> = std::env::vars().collect();
    overlay_environment(&current, overlay)
}
