// Library side of pidwatch: the poll loop and its capabilities, kept free of
// any CLI concerns so the binary stays a thin wrapper.
pub mod alert;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod process_status;

// Re-export the types the binary and tests reach for
pub use alert::{AlertEvent, AlertStatus};
pub use config::{MailConfig, MonitorTarget, MonitorTargetBuilder};
pub use error::{DeliveryError, MonitorError, Result};
pub use monitor::{LivenessMonitor, MonitorEvent, MonitorOutcome};
pub use notify::{LogNotifier, Notifier, SmtpNotifier};
pub use process_status::{
    os_provider, ProcessObservation, ProcessStatusProvider, ProviderKind, ScriptedProvider,
    SysinfoProvider,
};

#[cfg(target_os = "linux")]
pub use process_status::ProcfsProvider;

/// Watch `target` with an OS-backed provider until it dies, logging each step.
///
/// Only provider construction can fail; once polling starts the run always
/// ends with an outcome.
pub fn run_monitor<N: Notifier>(
    target: MonitorTarget,
    provider: ProviderKind,
    notifier: N,
) -> Result<MonitorOutcome> {
    target.validate()?;
    let provider = os_provider(provider)?;
    let mut monitor = LivenessMonitor::new(target, provider, notifier);
    Ok(monitor.run())
}
