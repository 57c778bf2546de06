//! Alert events and their rendered text

use crate::config::MonitorTarget;
use crate::error::DeliveryError;
use crate::process_status::ProcessObservation;
use askama::Template;
use std::fmt;

/// Why the run is raising an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Crashed,
    Terminated,
}

impl AlertStatus {
    /// Map a terminal observation to its alert status; `Alive` has none
    pub fn from_observation(observation: ProcessObservation) -> Option<Self> {
        match observation {
            ProcessObservation::Alive => None,
            ProcessObservation::CrashedZombie => Some(AlertStatus::Crashed),
            ProcessObservation::NotFound => Some(AlertStatus::Terminated),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertStatus::Crashed => "crashed",
            AlertStatus::Terminated => "terminated",
        }
    }

    pub fn capitalized(self) -> &'static str {
        match self {
            AlertStatus::Crashed => "Crashed",
            AlertStatus::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The single alert a monitoring run may produce
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub target: MonitorTarget,
    pub status: AlertStatus,
}

impl AlertEvent {
    pub fn new(target: MonitorTarget, status: AlertStatus) -> Self {
        Self { target, status }
    }

    /// Console line announcing the alert
    pub fn console_line(&self) -> String {
        let title = self.target.display_title();
        let pid = self.target.pid();
        match self.status {
            AlertStatus::Crashed => format!("[ALERT] {} (PID {}) has crashed!", title, pid),
            AlertStatus::Terminated => {
                format!("[ALERT] {} (PID {}) no longer exists!", title, pid)
            }
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "{} (PID {}) {}",
            self.target.display_title(),
            self.target.pid(),
            self.status.capitalized()
        )
    }

    /// HTML mail body rendered from `templates/alert.html`
    pub fn html_body(&self) -> Result<String, DeliveryError> {
        let template = AlertTemplate {
            title: self.target.display_title(),
            pid: self.target.pid(),
            status: self.status.label(),
            capitalized: self.status.capitalized(),
        };
        Ok(template.render()?)
    }
}

#[derive(Template)]
#[template(path = "alert.html")]
struct AlertTemplate<'a> {
    title: &'a str,
    pid: u32,
    status: &'static str,
    capitalized: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etl_target() -> MonitorTarget {
        MonitorTarget::new(4567, 5, Some("Data ETL Worker".to_string())).unwrap()
    }

    #[test]
    fn test_status_from_observation() {
        assert_eq!(AlertStatus::from_observation(ProcessObservation::Alive), None);
        assert_eq!(
            AlertStatus::from_observation(ProcessObservation::CrashedZombie),
            Some(AlertStatus::Crashed)
        );
        assert_eq!(
            AlertStatus::from_observation(ProcessObservation::NotFound),
            Some(AlertStatus::Terminated)
        );
    }

    #[test]
    fn test_console_lines() {
        let event = AlertEvent::new(etl_target(), AlertStatus::Terminated);
        assert_eq!(
            event.console_line(),
            "[ALERT] Data ETL Worker (PID 4567) no longer exists!"
        );

        let event = AlertEvent::new(etl_target(), AlertStatus::Crashed);
        assert_eq!(event.console_line(), "[ALERT] Data ETL Worker (PID 4567) has crashed!");
    }

    #[test]
    fn test_subject_and_body() {
        let event = AlertEvent::new(etl_target(), AlertStatus::Terminated);
        assert_eq!(event.subject(), "Data ETL Worker (PID 4567) Terminated");

        let body = event.html_body().unwrap();
        assert!(body.contains("Data ETL Worker Alert: Terminated"));
        assert!(body.contains("<strong style=\"color: #d9534f;\">4567</strong> has terminated."));
        assert!(body.contains("The Monitoring Team"));
    }

    #[test]
    fn test_default_title_in_subject() {
        let target = MonitorTarget::new(12, 10, None).unwrap();
        let event = AlertEvent::new(target, AlertStatus::Crashed);
        assert_eq!(event.subject(), "Kernel process (PID 12) Crashed");
    }

    #[test]
    fn test_title_is_escaped_in_body() {
        let target = MonitorTarget::new(7, 1, Some("<job> & co".to_string())).unwrap();
        let body = AlertEvent::new(target, AlertStatus::Crashed).html_body().unwrap();
        assert!(body.contains("&lt;job&gt; &amp; co"));
        assert!(!body.contains("<job>"));
    }
}
