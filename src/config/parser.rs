//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        let strings = [
            (&cli.endpoint, &mut config.endpoint),
            (&cli.ipv4_endpoint, &mut config.ipv4_endpoint),
            (&cli.ipv6_endpoint, &mut config.ipv6_endpoint),
        ];
        for (flag, field) in strings {
            if let Some(value) = flag {
                *field = value.clone();
            }
        }

        let optionals = [
            (&cli.device_id, &mut config.device_id),
            (&cli.org_tag, &mut config.org_tag),
            (&cli.free_tag, &mut config.free_tag),
            (&cli.ca_cert, &mut config.ca_cert),
        ];
        for (flag, field) in optionals {
            if flag.is_some() {
                *field = flag.clone();
            }
        }

        // Source and interface replace each other so a flag can override an env value
        if cli.source.is_some() {
            config.source = cli.source.clone();
            config.interface = None;
        }
        if cli.interface.is_some() {
            config.interface = cli.interface.clone();
            config.source = None;
        }

        if let Some(n) = cli.concurrency {
            config.concurrency = n;
        }
        if let Some(n) = cli.chunks {
            config.chunks = n;
        }
        if let Some(n) = cli.upload_size {
            config.upload_size = n;
        }
        if let Some(secs) = cli.duration {
            config.duration_seconds = secs;
        }
        if let Some(secs) = cli.timeout {
            config.timeout_seconds = secs;
        }

        config.force_ipv4 |= cli.ipv4;
        config.force_ipv6 |= cli.ipv6;
        config.use_icmp |= cli.icmp;
        config.ignore_tls_errors |= cli.ignore_tls_error;
        config.bytes |= cli.bytes;
        config.mebibytes |= cli.mebibytes;
        config.no_pre_allocate |= cli.no_pre_allocate;

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color || cli.json || !crate::cli::supports_color() {
            config.enable_color = false;
        }

        // Output mode flags are CLI-only
        config.quiet = cli.quiet;
        config.json = cli.json;
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Endpoint: {}", config.endpoint));
    summary.push(format!("IPv4 Endpoint: {}", config.ipv4_endpoint));
    summary.push(format!("IPv6 Endpoint: {}", config.ipv6_endpoint));

    let families = match (config.force_ipv4, config.force_ipv6) {
        (true, _) => "IPv4 only",
        (_, true) => "IPv6 only",
        _ => "IPv4 and IPv6",
    };
    summary.push(format!("Families: {}", families));

    if let Some(source) = &config.source {
        summary.push(format!("Source Address: {}", source));
    }
    if let Some(interface) = &config.interface {
        summary.push(format!("Interface: {}", interface));
    }

    summary.push(format!(
        "Ping: {}",
        if config.use_icmp { "ICMP" } else { "HTTP" }
    ));
    summary.push(format!(
        "Streams: {} x {}s, {} chunks, {} KiB upload",
        config.concurrency, config.duration_seconds, config.chunks, config.upload_size
    ));
    summary.push(format!("Units: {}", config.rate_unit().label()));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Cooldown: {}s", config.cooldown_seconds));
    summary.push(format!("TLS Verification: {}", !config.ignore_tls_errors));
    summary.push(format!("Color Output: {}", config.enable_color));

    summary.join("\n")
}
