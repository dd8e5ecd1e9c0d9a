//! Heap usage sampling via sysinfo

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use crate::traits::{HeapProbe, HeapSample};

/// Samples this process's resident memory against total system memory.
pub struct RealHeapProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl RealHeapProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for RealHeapProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapProbe for RealHeapProbe {
    fn sample(&self) -> Option<HeapSample> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_memory();
        system.refresh_process(pid);

        let used_bytes = system.process(pid)?.memory();
        let max_bytes = system.total_memory();
        if max_bytes == 0 {
            return None;
        }
        Some(HeapSample {
            used_bytes,
            max_bytes,
        })
    }
}
