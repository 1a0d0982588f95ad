//! ICMP round-trip sampling through the system `ping` tool

use crate::{
    error::{AppError, Result},
    types::{NetworkFamily, SourceBinding},
};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

const RTT_PATTERN: &str = r"time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms";

static RTT_REGEX: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(RTT_PATTERN));

/// Runs the platform ping binary and extracts per-reply round-trip times
#[derive(Debug, Clone)]
pub struct SystemPing {
    program: String,
    /// Seconds to wait for each reply
    reply_timeout: Duration,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self {
            program: "ping".to_string(),
            reply_timeout: Duration::from_secs(2),
        }
    }
}

impl SystemPing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different ping binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command-line arguments for one run
    pub fn arguments(
        &self,
        host: &str,
        count: u32,
        family: NetworkFamily,
        source: Option<&SourceBinding>,
    ) -> Vec<String> {
        let mut args = vec![
            match family {
                NetworkFamily::V4 => "-4".to_string(),
                NetworkFamily::V6 => "-6".to_string(),
            },
            "-n".to_string(),
            "-c".to_string(),
            count.max(1).to_string(),
            "-W".to_string(),
            self.reply_timeout.as_secs().max(1).to_string(),
        ];
        if let Some(source) = source {
            args.push("-I".to_string());
            args.push(source.as_ping_source());
        }
        args.push(host.to_string());
        args
    }

    /// Ping `host` `count` times and return the reply RTTs in milliseconds
    pub async fn sample(
        &self,
        host: &str,
        count: u32,
        family: NetworkFamily,
        source: Option<&SourceBinding>,
    ) -> Result<Vec<f64>> {
        let output = Command::new(&self.program)
            .args(self.arguments(host, count, family, source))
            .output()
            .await
            .map_err(|e| AppError::io(format!("Failed to run {}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let samples = parse_rtts(&stdout)?;
        if samples.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::measurement(format!(
                "No ICMP replies from {} ({})",
                host,
                stderr.trim()
            )));
        }
        Ok(samples)
    }
}

/// Extract `time=X ms` values from ping output
pub fn parse_rtts(output: &str) -> Result<Vec<f64>> {
    let pattern = RTT_REGEX
        .as_ref()
        .map_err(|e| AppError::internal(format!("Invalid RTT pattern: {}", e)))?;

    Ok(pattern
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OUTPUT: &str = "\
PING speed.example.net (192.0.2.8) 56(84) bytes of data.
64 bytes from 192.0.2.8: icmp_seq=1 ttl=57 time=12.4 ms
64 bytes from 192.0.2.8: icmp_seq=2 ttl=57 time=11.9 ms
64 bytes from 192.0.2.8: icmp_seq=3 ttl=57 time=13 ms

--- speed.example.net ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 11.900/12.433/13.000/0.450 ms
";

    #[test]
    fn test_parse_linux_output() {
        let rtts = parse_rtts(LINUX_OUTPUT).unwrap();
        assert_eq!(rtts, vec![12.4, 11.9, 13.0]);
    }

    #[test]
    fn test_parse_sub_millisecond_reply() {
        let rtts = parse_rtts("64 bytes from ::1: icmp_seq=1 ttl=64 time<1 ms").unwrap();
        assert_eq!(rtts, vec![1.0]);
    }

    #[test]
    fn test_rtt_pattern_compiled_once() {
        let before: *const Regex = RTT_REGEX.as_ref().unwrap();
        parse_rtts(LINUX_OUTPUT).unwrap();
        parse_rtts(LINUX_OUTPUT).unwrap();
        let after: *const Regex = RTT_REGEX.as_ref().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_parse_no_replies() {
        let rtts = parse_rtts("3 packets transmitted, 0 received, 100% packet loss").unwrap();
        assert!(rtts.is_empty());
    }

    #[test]
    fn test_arguments() {
        let ping = SystemPing::new();
        let source = SourceBinding::Address("2001:db8::2".parse().unwrap());
        let args = ping.arguments("speed.example.net", 10, NetworkFamily::V6, Some(&source));
        assert_eq!(
            args,
            vec!["-6", "-n", "-c", "10", "-W", "2", "-I", "2001:db8::2", "speed.example.net"]
        );

        let args = ping.arguments("speed.example.net", 0, NetworkFamily::V4, None);
        assert_eq!(args[0], "-4");
        assert_eq!(args[3], "1");
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let ping = SystemPing::new().with_program("definitely-not-a-ping-binary");
        let err = ping.sample("127.0.0.1", 1, NetworkFamily::V4, None).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
