//! Error types for pidwatch
//!
//! Startup problems surface as [`MonitorError`]. Anything that goes wrong while
//! dispatching an alert is a [`DeliveryError`], which the monitor catches and
//! reports instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised before the monitoring loop starts
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised while sending an alert notification
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("cannot read {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: expected an array of addresses or {{\"recipients\": [...]}}", path.display())]
    RecipientsShape { path: PathBuf },

    #[error("no recipients configured")]
    NoRecipients,

    #[error("cannot render alert body: {0}")]
    Render(#[from] askama::Error),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("cannot build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
