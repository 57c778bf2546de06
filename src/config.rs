//! Monitoring target and notification settings
//!
//! A [`MonitorTarget`] is fixed for the lifetime of one run. It is built through
//! [`MonitorTargetBuilder`], which validates the PID and the check interval.

use crate::error::{MonitorError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Title used when the caller does not name the process
pub const DEFAULT_TITLE: &str = "Kernel process";

/// Seconds between liveness polls when none is given
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

pub const DEFAULT_RECIPIENTS_FILE: &str = "./json/recipients.json";
pub const DEFAULT_CREDENTIALS_FILE: &str = "./json/credentials.json";

/// The process being watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    pid: u32,
    check_interval: Duration,
    title: Option<String>,
}

impl MonitorTarget {
    pub fn builder() -> MonitorTargetBuilder {
        MonitorTargetBuilder::default()
    }

    /// Shorthand for a validated target with a title and an interval in seconds
    pub fn new(pid: u32, interval_secs: u64, title: Option<String>) -> Result<Self> {
        let mut builder = Self::builder().pid(pid).interval_secs(interval_secs);
        if let Some(title) = title {
            builder = builder.title(title);
        }
        builder.build()
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Custom title, if one was given
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title shown in log lines and alerts
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pid == 0 {
            return Err(MonitorError::InvalidConfiguration(
                "PID must be a positive integer".to_string(),
            ));
        }
        if self.check_interval.is_zero() {
            return Err(MonitorError::InvalidConfiguration(
                "check interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`MonitorTarget`]
#[derive(Debug, Clone)]
pub struct MonitorTargetBuilder {
    pid: u32,
    check_interval: Duration,
    title: Option<String>,
}

impl Default for MonitorTargetBuilder {
    fn default() -> Self {
        Self {
            pid: 0,
            check_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            title: None,
        }
    }
}

impl MonitorTargetBuilder {
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.check_interval = Duration::from_secs(secs);
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Blank titles fall back to [`DEFAULT_TITLE`]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = if title.trim().is_empty() {
            None
        } else {
            Some(title)
        };
        self
    }

    pub fn build(self) -> Result<MonitorTarget> {
        let target = MonitorTarget {
            pid: self.pid,
            check_interval: self.check_interval,
            title: self.title,
        };
        target.validate()?;
        Ok(target)
    }
}

/// Where the SMTP notifier finds its recipients and sender credentials.
///
/// The files are only read when an alert is dispatched, so a missing file
/// shows up as a delivery failure rather than a startup error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub recipients_file: PathBuf,
    pub credentials_file: PathBuf,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            recipients_file: PathBuf::from(DEFAULT_RECIPIENTS_FILE),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_builder() -> Result<()> {
        let target = MonitorTarget::builder()
            .pid(4567)
            .interval_secs(5)
            .title("Data ETL Worker")
            .build()?;

        assert_eq!(target.pid(), 4567);
        assert_eq!(target.check_interval(), Duration::from_secs(5));
        assert_eq!(target.display_title(), "Data ETL Worker");
        Ok(())
    }

    #[test]
    fn test_target_defaults() -> Result<()> {
        let target = MonitorTarget::builder().pid(42).build()?;
        assert_eq!(target.check_interval(), Duration::from_secs(10));
        assert_eq!(target.title(), None);
        assert_eq!(target.display_title(), "Kernel process");
        Ok(())
    }

    #[test]
    fn test_target_validation() {
        assert!(MonitorTarget::builder().build().is_err());
        assert!(MonitorTarget::new(42, 0, None).is_err());
        assert!(MonitorTarget::builder()
            .pid(42)
            .check_interval(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_blank_title_uses_default() -> Result<()> {
        let target = MonitorTarget::new(42, 1, Some("   ".to_string()))?;
        assert_eq!(target.display_title(), DEFAULT_TITLE);
        Ok(())
    }

    #[test]
    fn test_mail_config_default_paths() {
        let mail = MailConfig::default();
        assert_eq!(mail.recipients_file, PathBuf::from("./json/recipients.json"));
        assert_eq!(mail.credentials_file, PathBuf::from("./json/credentials.json"));
    }
}
