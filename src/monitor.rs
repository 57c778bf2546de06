//! The liveness poll loop
//!
//! [`LivenessMonitor`] polls one PID at a fixed interval until the process is
//! observed crashed or gone, then raises exactly one alert and returns. Delivery
//! failures are reported, never retried and never propagated.

use crate::alert::{AlertEvent, AlertStatus};
use crate::config::MonitorTarget;
use crate::error::DeliveryError;
use crate::notify::Notifier;
use crate::process_status::ProcessStatusProvider;
use log::{debug, error, info, warn};
use std::time::Duration;

/// Something worth reporting during a run
#[derive(Debug)]
pub enum MonitorEvent<'a> {
    /// Emitted once before the first poll
    Started { line: String },
    /// The process was alive on poll number `poll` (1-based)
    Alive { poll: u64 },
    /// A terminal observation was made
    Alert { event: &'a AlertEvent, line: String },
    /// The notifier accepted the alert
    Delivered { line: String },
    /// The notifier failed; the run still ends normally
    DeliveryFailed { error: &'a DeliveryError, line: String },
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub status: AlertStatus,
    /// Polls that found the process alive before the terminal one
    pub alive_polls: u64,
    /// Whether the alert notification went out
    pub delivered: bool,
}

/// Polls a single target until it dies
pub struct LivenessMonitor<P, N> {
    target: MonitorTarget,
    provider: P,
    notifier: N,
    sleeper: Box<dyn FnMut(Duration)>,
}

impl<P: ProcessStatusProvider, N: Notifier> LivenessMonitor<P, N> {
    pub fn new(target: MonitorTarget, provider: P, notifier: N) -> Self {
        Self {
            target,
            provider,
            notifier,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between polls
    pub fn with_sleeper<F>(mut self, sleeper: F) -> Self
    where
        F: FnMut(Duration) + 'static,
    {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run until the target dies, reporting through the `log` facade
    pub fn run(&mut self) -> MonitorOutcome {
        self.run_with_reporter(log_event)
    }

    /// Run until the target dies, passing each event to `reporter`
    pub fn run_with_reporter<F>(&mut self, mut reporter: F) -> MonitorOutcome
    where
        F: FnMut(&MonitorEvent),
    {
        let title = self.target.display_title().to_string();
        let pid = self.target.pid();
        let interval = self.target.check_interval();

        reporter(&MonitorEvent::Started {
            line: format!("[INFO] Monitoring '{}' with PID {}...", title, pid),
        });

        let mut alive_polls = 0u64;
        let status = loop {
            let observation = self.provider.observe(pid);
            debug!("PID {} observed as {:?}", pid, observation);

            match AlertStatus::from_observation(observation) {
                Some(status) => break status,
                None => {
                    alive_polls += 1;
                    reporter(&MonitorEvent::Alive { poll: alive_polls });
                    (self.sleeper)(interval);
                }
            }
        };

        let event = AlertEvent::new(self.target.clone(), status);
        reporter(&MonitorEvent::Alert {
            event: &event,
            line: event.console_line(),
        });

        let sent = event
            .html_body()
            .and_then(|body| self.notifier.send(&event.subject(), &body));
        let delivered = match sent {
            Ok(()) => {
                reporter(&MonitorEvent::Delivered {
                    line: format!(
                        "[INFO] {}: {} (PID {}) {}.",
                        self.notifier.delivered_label(),
                        title,
                        pid,
                        status
                    ),
                });
                true
            }
            Err(err) => {
                let line = format!(
                    "[ERROR] Failed to send email for {} (PID {}): {}",
                    title, pid, err
                );
                reporter(&MonitorEvent::DeliveryFailed { error: &err, line });
                false
            }
        };

        MonitorOutcome {
            status,
            alive_polls,
            delivered,
        }
    }
}

/// Default reporter: one log record per event
pub fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Started { line } | MonitorEvent::Delivered { line } => info!("{}", line),
        MonitorEvent::Alive { poll } => debug!("poll {}: alive", poll),
        MonitorEvent::Alert { line, .. } => warn!("{}", line),
        MonitorEvent::DeliveryFailed { line, .. } => error!("{}", line),
    }
}
