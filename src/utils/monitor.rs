use crate::domain::model::RunState;
use crate::domain::ports::ChunkListener;
use crate::utils::error::EtlError;
#[cfg(feature = "cli")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Resident memory of this process at one chunk boundary.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy)]
pub struct MemorySample {
    pub resident_mb: u64,
    pub peak_mb: u64,
    pub elapsed: Duration,
}

/// Samples the process memory after every committed chunk.
///
/// Memory should stay flat across chunks; a climbing peak means records are being
/// retained past their chunk.
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    started: Instant,
    peak_mb: AtomicU64,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = enabled
            .then(sysinfo::get_current_pid)
            .and_then(|pid| match pid {
                Ok(pid) => Some(pid),
                Err(e) => {
                    tracing::warn!("⚠️ Memory monitoring disabled: {}", e);
                    None
                }
            });

        Self {
            system: Mutex::new(System::new()),
            pid,
            started: Instant::now(),
            peak_mb: AtomicU64::new(0),
        }
    }

    pub fn sample(&self) -> Option<MemorySample> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let resident_mb = system.process(pid)?.memory() / 1024 / 1024;
        let peak_mb = self.peak_mb.fetch_max(resident_mb, Ordering::Relaxed).max(resident_mb);

        Some(MemorySample {
            resident_mb,
            peak_mb,
            elapsed: self.started.elapsed(),
        })
    }

    pub fn log_sample(&self, phase: &str) {
        if let Some(sample) = self.sample() {
            tracing::info!(
                "📊 {} - Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                sample.resident_mb,
                sample.peak_mb,
                sample.elapsed
            );
        }
    }

    pub fn log_peak(&self) {
        if let Some(sample) = self.sample() {
            tracing::info!(
                "📊 Run finished in {:?}, peak memory {}MB",
                sample.elapsed,
                sample.peak_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.pid.is_some()
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置沒有 sysinfo，監控一律關閉
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_sample(&self, _phase: &str) {}

    pub fn log_peak(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

impl ChunkListener for SystemMonitor {
    fn after_chunk(&self, chunk_index: usize, state: &RunState) {
        if self.is_enabled() {
            self.log_sample(&format!(
                "Chunk {} ({} records written)",
                chunk_index, state.records_written
            ));
        }
    }

    fn on_chunk_error(&self, chunk_index: usize, _error: &EtlError) {
        if self.is_enabled() {
            self.log_sample(&format!("Chunk {} failed", chunk_index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_is_silent() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        monitor.after_chunk(0, &RunState::default());
        monitor.log_peak();
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_enabled_monitor_tracks_peak_memory() {
        let monitor = SystemMonitor::new(true);
        if !monitor.is_enabled() {
            return;
        }

        let first = monitor.sample().unwrap();
        let second = monitor.sample().unwrap();
        assert!(first.peak_mb >= first.resident_mb);
        assert!(second.peak_mb >= first.peak_mb);
        assert!(second.elapsed >= first.elapsed);
    }
}
