//! Alert delivery
//!
//! The monitor only sees the [`Notifier`] trait. [`SmtpNotifier`] reads its
//! recipient list and sender credentials from JSON files each time it sends,
//! so configuration mistakes surface as a [`DeliveryError`] at dispatch time.

use crate::config::MailConfig;
use crate::error::DeliveryError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Capability for sending one alert
pub trait Notifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError>;

    /// Prefix of the console line printed after a successful `send`
    fn delivered_label(&self) -> &'static str {
        "Email sent"
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        (**self).send(subject, html_body)
    }

    fn delivered_label(&self) -> &'static str {
        (**self).delivered_label()
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        (**self).send(subject, html_body)
    }

    fn delivered_label(&self) -> &'static str {
        (**self).delivered_label()
    }
}

/// Recipients file: a bare array or `{ "recipients": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum RecipientsFile {
    List(Vec<String>),
    Object { recipients: Vec<String> },
}

/// Sender account used to log in to the SMTP relay
#[derive(Deserialize, Clone)]
pub struct SenderCredentials {
    #[serde(alias = "sender_email")]
    pub email: String,
    #[serde(alias = "sender_password")]
    pub password: String,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl fmt::Debug for SenderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DeliveryError> {
    let contents = fs::read_to_string(path).map_err(|source| DeliveryError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| DeliveryError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the recipient addresses, rejecting an empty list
pub fn load_recipients(path: &Path) -> Result<Vec<String>, DeliveryError> {
    let file = match read_json::<RecipientsFile>(path) {
        // Valid JSON of the wrong shape; serde's untagged error is not helpful here
        Err(DeliveryError::ParseConfig { path, source }) if source.is_data() => {
            return Err(DeliveryError::RecipientsShape { path });
        }
        other => other?,
    };
    let recipients = match file {
        RecipientsFile::List(list) => list,
        RecipientsFile::Object { recipients } => recipients,
    };
    let recipients: Vec<String> = recipients
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    if recipients.is_empty() {
        return Err(DeliveryError::NoRecipients);
    }
    Ok(recipients)
}

pub fn load_credentials(path: &Path) -> Result<SenderCredentials, DeliveryError> {
    read_json(path)
}

/// Build the HTML alert message; validates every address
pub fn build_message(
    sender: &str,
    recipients: &[String],
    subject: &str,
    html_body: &str,
) -> Result<Message, DeliveryError> {
    let from: Mailbox = sender.parse()?;
    let mut builder = Message::builder()
        .from(from)
        .subject(subject)
        .header(ContentType::TEXT_HTML);

    for recipient in recipients {
        let to: Mailbox = recipient.parse()?;
        builder = builder.to(to);
    }

    Ok(builder.body(html_body.to_string())?)
}

/// Sends alerts as HTML mail through an authenticated SMTP relay
#[derive(Debug, Clone, Default)]
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn transport(credentials: &SenderCredentials) -> Result<SmtpTransport, DeliveryError> {
        let login = Credentials::new(credentials.email.clone(), credentials.password.clone());
        // Port 465 speaks TLS from the first byte, everything else upgrades with STARTTLS
        let builder = if credentials.smtp_port == 465 {
            SmtpTransport::relay(&credentials.smtp_server)?
        } else {
            SmtpTransport::starttls_relay(&credentials.smtp_server)?
        };
        Ok(builder.port(credentials.smtp_port).credentials(login).build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        let recipients = load_recipients(&self.config.recipients_file)?;
        let credentials = load_credentials(&self.config.credentials_file)?;
        let message = build_message(&credentials.email, &recipients, subject, html_body)?;

        debug!(
            "Sending alert via {}:{} to {} recipient(s)",
            credentials.smtp_server,
            credentials.smtp_port,
            recipients.len()
        );
        Self::transport(&credentials)?.send(&message)?;
        Ok(())
    }
}

/// Writes the alert to the log instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, html_body: &str) -> Result<(), DeliveryError> {
        info!("Dry run, not sending alert: {}", subject);
        debug!("Alert body:\n{}", html_body);
        Ok(())
    }

    fn delivered_label(&self) -> &'static str {
        "Dry run, email not sent"
    }
}
