use clap::{Parser, ValueEnum};
use colored::*;
use log::debug;
use pidwatch::config::{DEFAULT_CREDENTIALS_FILE, DEFAULT_INTERVAL_SECS, DEFAULT_RECIPIENTS_FILE};
use pidwatch::{
    os_provider, LivenessMonitor, LogNotifier, MailConfig, MonitorEvent, MonitorTarget, Notifier,
    ProviderKind, SmtpNotifier,
};
use std::path::PathBuf;
use std::process::exit;

/// Watch a process by PID and send an alert when it crashes or disappears
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Process ID (PID) to monitor
    #[clap(long, value_parser = clap::value_parser!(u32).range(1..))]
    pid: u32,

    /// Check interval in seconds
    #[clap(short, long, default_value_t = DEFAULT_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Optional custom name for the monitored process
    #[clap(long, value_name = "TITLE")]
    custom_title: Option<String>,

    /// JSON file listing alert recipients
    #[clap(long, value_name = "FILE", default_value = DEFAULT_RECIPIENTS_FILE)]
    recipients: PathBuf,

    /// JSON file with the sender's SMTP credentials
    #[clap(long, value_name = "FILE", default_value = DEFAULT_CREDENTIALS_FILE)]
    credentials: PathBuf,

    /// Log the alert instead of sending mail
    #[clap(long)]
    dry_run: bool,

    /// Backend used to look up the process
    #[clap(long, value_enum, default_value_t = Provider::Auto)]
    provider: Provider,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// procfs on Linux, sysinfo elsewhere
    Auto,
    Sysinfo,
    Procfs,
}

impl From<Provider> for ProviderKind {
    fn from(provider: Provider) -> Self {
        match provider {
            Provider::Auto => ProviderKind::Auto,
            Provider::Sysinfo => ProviderKind::Sysinfo,
            Provider::Procfs => ProviderKind::Procfs,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let target = match MonitorTarget::new(args.pid, args.interval, args.custom_title.clone()) {
        Ok(target) => target,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit(1);
        }
    };

    let provider = match os_provider(args.provider.into()) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit(1);
        }
    };

    let notifier: Box<dyn Notifier> = if args.dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(SmtpNotifier::new(MailConfig {
            recipients_file: args.recipients,
            credentials_file: args.credentials,
        }))
    };

    let mut monitor = LivenessMonitor::new(target, provider, notifier);
    let outcome = monitor.run_with_reporter(print_event);

    debug!(
        "Monitoring finished: {} after {} alive poll(s), delivered: {}",
        outcome.status, outcome.alive_polls, outcome.delivered
    );
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Started { line } => println!("{}", line.cyan()),
        MonitorEvent::Alive { poll } => debug!("poll {}: alive", poll),
        MonitorEvent::Alert { line, .. } => println!("{}", line.red().bold()),
        MonitorEvent::Delivered { line } => println!("{}", line.green()),
        MonitorEvent::DeliveryFailed { line, .. } => eprintln!("{}", line.red()),
    }
}
