//! Process liveness lookups
//!
//! The monitor never touches the OS process table directly. It asks a
//! [`ProcessStatusProvider`] for one [`ProcessObservation`] per poll, which keeps
//! the loop testable with [`ScriptedProvider`].

use crate::error::Result;
use log::{debug, warn};
use std::collections::VecDeque;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Result of a single liveness poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessObservation {
    /// The process exists and is not a zombie
    Alive,
    /// The process table still has an entry, but it is a zombie or dead
    CrashedZombie,
    /// No process with this PID exists (or the PID now belongs to another process)
    NotFound,
}

impl ProcessObservation {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProcessObservation::Alive)
    }
}

/// Capability for classifying a PID
pub trait ProcessStatusProvider {
    fn observe(&mut self, pid: u32) -> ProcessObservation;
}

impl<P: ProcessStatusProvider + ?Sized> ProcessStatusProvider for Box<P> {
    fn observe(&mut self, pid: u32) -> ProcessObservation {
        (**self).observe(pid)
    }
}

/// Remembers the start time of the first successful lookup so that a
/// recycled PID is not mistaken for the watched process.
#[derive(Debug, Default)]
struct StartTimeGuard {
    seen: Option<(u32, u64)>,
}

impl StartTimeGuard {
    fn is_reused(&mut self, pid: u32, start_time: u64) -> bool {
        match self.seen {
            Some((seen_pid, seen_start)) if seen_pid == pid => {
                if seen_start != start_time {
                    debug!(
                        "PID {} start time changed ({} -> {}), treating as gone",
                        pid, seen_start, start_time
                    );
                    true
                } else {
                    false
                }
            }
            _ => {
                self.seen = Some((pid, start_time));
                false
            }
        }
    }
}

/// Cross-platform provider backed by sysinfo
pub struct SysinfoProvider {
    system: System,
    guard: StartTimeGuard,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            guard: StartTimeGuard::default(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessStatusProvider for SysinfoProvider {
    fn observe(&mut self, pid: u32) -> ProcessObservation {
        let sys_pid = Pid::from_u32(pid);
        // Dead entries must be dropped, otherwise a vanished PID stays cached
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );

        let Some(process) = self.system.process(sys_pid) else {
            return ProcessObservation::NotFound;
        };

        if self.guard.is_reused(pid, process.start_time()) {
            return ProcessObservation::NotFound;
        }

        match process.status() {
            ProcessStatus::Zombie | ProcessStatus::Dead => ProcessObservation::CrashedZombie,
            _ => ProcessObservation::Alive,
        }
    }
}

/// Linux provider reading `/proc/<pid>/stat` through procfs
#[cfg(target_os = "linux")]
#[derive(Default)]
pub struct ProcfsProvider {
    guard: StartTimeGuard,
}

#[cfg(target_os = "linux")]
impl ProcfsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_os = "linux")]
impl ProcessStatusProvider for ProcfsProvider {
    fn observe(&mut self, pid: u32) -> ProcessObservation {
        use procfs::process::{ProcState, Process};
        use procfs::ProcError;

        let Ok(raw_pid) = i32::try_from(pid) else {
            return ProcessObservation::NotFound;
        };

        let stat = match Process::new(raw_pid).and_then(|p| p.stat()) {
            Ok(stat) => stat,
            Err(ProcError::NotFound(_)) => return ProcessObservation::NotFound,
            Err(err) => {
                // The /proc entry exists but could not be read in full
                warn!("Cannot read /proc/{}/stat: {}", pid, err);
                return ProcessObservation::Alive;
            }
        };

        if self.guard.is_reused(pid, stat.starttime) {
            return ProcessObservation::NotFound;
        }

        match stat.state() {
            Ok(ProcState::Zombie) | Ok(ProcState::Dead) => ProcessObservation::CrashedZombie,
            Ok(_) => ProcessObservation::Alive,
            Err(err) => {
                warn!("Unknown state for PID {}: {}", pid, err);
                ProcessObservation::Alive
            }
        }
    }
}

/// Which real provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// procfs on Linux, sysinfo elsewhere
    #[default]
    Auto,
    Sysinfo,
    Procfs,
}

/// Build the OS-backed provider for `kind`
pub fn os_provider(kind: ProviderKind) -> Result<Box<dyn ProcessStatusProvider>> {
    match kind {
        ProviderKind::Sysinfo => Ok(Box::new(SysinfoProvider::new())),
        #[cfg(target_os = "linux")]
        ProviderKind::Auto | ProviderKind::Procfs => Ok(Box::new(ProcfsProvider::new())),
        #[cfg(not(target_os = "linux"))]
        ProviderKind::Auto => Ok(Box::new(SysinfoProvider::new())),
        #[cfg(not(target_os = "linux"))]
        ProviderKind::Procfs => Err(crate::error::MonitorError::InvalidConfiguration(
            "the procfs provider is only available on Linux".to_string(),
        )),
    }
}

/// Provider that replays a fixed sequence of observations.
///
/// Once the script runs out, the last observation repeats. An empty script
/// always reports [`ProcessObservation::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: VecDeque<ProcessObservation>,
    last: Option<ProcessObservation>,
    polls: usize,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = ProcessObservation>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            polls: 0,
        }
    }

    /// `alive_polls` times [`ProcessObservation::Alive`], then `terminal`
    pub fn alive_then(alive_polls: usize, terminal: ProcessObservation) -> Self {
        let mut script = vec![ProcessObservation::Alive; alive_polls];
        script.push(terminal);
        Self::new(script)
    }

    /// Number of times `observe` was called
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl ProcessStatusProvider for ScriptedProvider {
    fn observe(&mut self, _pid: u32) -> ProcessObservation {
        self.polls += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        self.last.unwrap_or(ProcessObservation::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(!ProcessObservation::Alive.is_terminal());
        assert!(ProcessObservation::CrashedZombie.is_terminal());
        assert!(ProcessObservation::NotFound.is_terminal());
    }

    #[test]
    fn test_scripted_provider_repeats_last() {
        let mut provider = ScriptedProvider::alive_then(2, ProcessObservation::CrashedZombie);
        assert_eq!(provider.observe(1), ProcessObservation::Alive);
        assert_eq!(provider.observe(1), ProcessObservation::Alive);
        assert_eq!(provider.observe(1), ProcessObservation::CrashedZombie);
        assert_eq!(provider.observe(1), ProcessObservation::CrashedZombie);
        assert_eq!(provider.polls(), 4);

        let mut empty = ScriptedProvider::default();
        assert_eq!(empty.observe(1), ProcessObservation::NotFound);
    }

    #[test]
    fn test_start_time_guard() {
        let mut guard = StartTimeGuard::default();
        assert!(!guard.is_reused(10, 100));
        assert!(!guard.is_reused(10, 100));
        assert!(guard.is_reused(10, 101));
    }

    #[test]
    fn test_current_process_is_alive() {
        let pid = std::process::id();
        let mut provider = SysinfoProvider::new();
        assert_eq!(provider.observe(pid), ProcessObservation::Alive);

        let mut provider = os_provider(ProviderKind::Auto).unwrap();
        assert_eq!(provider.observe(pid), ProcessObservation::Alive);
    }

    #[test]
    fn test_missing_pid_is_not_found() {
        // Above the default Linux pid_max, so never allocated there
        let pid = i32::MAX as u32;
        let mut provider = SysinfoProvider::new();
        assert_eq!(provider.observe(pid), ProcessObservation::NotFound);

        let mut provider = os_provider(ProviderKind::Auto).unwrap();
        assert_eq!(provider.observe(pid), ProcessObservation::NotFound);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_procfs_rejects_out_of_range_pid() {
        let mut provider = ProcfsProvider::new();
        assert_eq!(provider.observe(u32::MAX), ProcessObservation::NotFound);
    }
}
