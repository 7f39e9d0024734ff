//! Process memory sampling for diagnostics.
//!
//! Readings are only ever logged; nothing in the search path reacts to them.

use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Tracks resident memory growth of the current process against a baseline
#[derive(Debug)]
pub struct MemoryMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    baseline: Option<u64>,
}

impl MemoryMonitor {
    /// Create a monitor whose baseline is the current resident set size
    pub fn new() -> Self {
        let mut monitor = Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
            baseline: None,
        };
        monitor.baseline = monitor.resident_set_size();
        monitor
    }

    /// Current resident set size in bytes, if the platform reports it
    pub fn resident_set_size(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).map(|process| process.memory())
    }

    /// Bytes gained (or lost) since the baseline
    pub fn growth(&self) -> Option<i64> {
        let baseline = self.baseline?;
        let current = self.resident_set_size()?;
        Some(current as i64 - baseline as i64)
    }

    /// Human-readable growth and total, e.g. `"+12 MiB (total 48 MiB)"`
    pub fn describe(&self) -> String {
        match (self.growth(), self.resident_set_size()) {
            (Some(growth), Some(total)) => {
                let sign = if growth < 0 { "-" } else { "+" };
                format!(
                    "{}{} (total {})",
                    sign,
                    humanize_bytes(growth.unsigned_abs()),
                    humanize_bytes(total)
                )
            }
            _ => "unavailable".to_string(),
        }
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a byte count with binary units and no decimals
pub fn humanize_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.0} {}", value, UNITS[unit])
}
