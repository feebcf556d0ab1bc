use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Command-line configuration for the maildrop server.
#[derive(Debug, Parser)]
#[command(
    name = "maildrop",
    about = "A topic-partitioned durable message buffer over HTTP"
)]
pub struct Cli {
    /// Path for storing message data
    #[arg(long, default_value = "messages.redb")]
    pub storage_path: PathBuf,

    /// Address to listen on for web requests
    #[arg(long, default_value = "127.0.0.1:9099")]
    pub listen_address: SocketAddr,

    /// Retention time after which stored messages are purged
    #[arg(long, default_value = "24h", value_parser = humantime::parse_duration)]
    pub retention: Duration,

    /// Interval at which garbage collection cycles purge old entries
    #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
    pub gc_interval: Duration,

    /// Interval at which new messages are pushed to watching clients
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    pub push_interval: Duration,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["maildrop"]);
        assert_eq!(cli.retention, Duration::from_secs(24 * 60 * 60));
        assert_eq!(cli.gc_interval, Duration::from_secs(10 * 60));
        assert_eq!(cli.push_interval, Duration::from_secs(5));
        assert_eq!(cli.listen_address.port(), 9099);
    }

    #[test]
    fn durations_accept_humantime_strings() {
        let cli = Cli::parse_from(["maildrop", "--retention", "90m", "--push-interval", "250ms"]);
        assert_eq!(cli.retention, Duration::from_secs(90 * 60));
        assert_eq!(cli.push_interval, Duration::from_millis(250));
    }
}
