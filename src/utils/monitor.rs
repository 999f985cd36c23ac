use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
    pub phase_time: Duration,
    pub total_time: Duration,
}

/// Per-phase resource usage of the training process. Disabled monitors only
/// keep wall-clock timings.
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
    last_phase: Mutex<Instant>,
    peak_memory_mb: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };
        let now = Instant::now();

        Self {
            system: Mutex::new(System::new()),
            pid,
            started: now,
            last_phase: Mutex::new(now),
            peak_memory_mb: Mutex::new(0),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Close the current phase and log its stats.
    pub fn phase_done(&self, phase: &str) -> Option<PhaseStats> {
        let phase_time = {
            let mut last = self.last_phase.lock().ok()?;
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        if !self.enabled {
            tracing::debug!("{} finished in {:?}", phase, phase_time);
            return None;
        }

        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        let stats = PhaseStats {
            phase: phase.to_string(),
            cpu_usage: process.cpu_usage(),
            memory_mb,
            peak_memory_mb: *peak,
            phase_time,
            total_time: self.started.elapsed(),
        };

        tracing::info!(
            "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Phase: {:?}",
            stats.phase,
            stats.cpu_usage,
            stats.memory_mb,
            stats.peak_memory_mb,
            stats.phase_time
        );
        Some(stats)
    }

    pub fn log_final_stats(&self) {
        let peak = self.peak_memory_mb.lock().map(|p| *p).unwrap_or(0);
        if self.enabled {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.started.elapsed(),
                peak
            );
        } else {
            tracing::debug!("Total time: {:?}", self.started.elapsed());
        }
    }
}

#[cfg(not(feature = "cli"))]
pub struct SystemMonitor {
    started: Instant,
}

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn phase_done(&self, _phase: &str) -> Option<PhaseStats> {
        None
    }

    pub fn log_final_stats(&self) {
        tracing::debug!("Total time: {:?}", self.started.elapsed());
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.phase_done("load").is_none());
    }

    #[test]
    fn test_enabled_monitor_tracks_peak_memory() {
        let monitor = SystemMonitor::new(true);
        let first = monitor.phase_done("load");
        let second = monitor.phase_done("train");
        if let (Some(first), Some(second)) = (first, second) {
            assert_eq!(second.phase, "train");
            assert!(second.peak_memory_mb >= first.memory_mb);
            assert!(second.total_time >= first.total_time);
        }
    }
}
