//! Process memory sampling for event enrichment

use super::log_event::MemoryUsage;
use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// Reads this process's memory figures.
///
/// Keeps one `System` around; refreshing a single process is cheap compared
/// to rebuilding the whole table per event.
pub struct MemorySampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }

    /// `None` when the platform does not expose process information
    pub fn sample(&self) -> Option<MemoryUsage> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|process| MemoryUsage {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        })
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySampler").field("pid", &self.pid).finish()
    }
}
