//! Additional comprehensive tests for configuration parsing and validation

use super::{ConfigParser, EnvManager};
use crate::{
    cli::{Cli, Command, GlobalArgs},
    defaults::*,
    models::Config,
};
use clap::Parser;
use proptest::prelude::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

/// Test edge cases in configuration limits
mod config_edge_cases {
    use super::*;

    #[test]
    fn test_config_at_upper_limits() {
        let config = Config {
            trial_count: MAX_TRIAL_COUNT,
            concurrency: MAX_CONCURRENCY,
            timeout_seconds: MAX_TIMEOUT_SECONDS,
            payload_size: MAX_PAYLOAD_SIZE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        assert!(Config { trial_count: MAX_TRIAL_COUNT + 1, ..config.clone() }.validate().is_err());
        assert!(Config { concurrency: MAX_CONCURRENCY + 1, ..config.clone() }.validate().is_err());
        assert!(Config { timeout_seconds: MAX_TIMEOUT_SECONDS + 1, ..config.clone() }.validate().is_err());
        assert!(Config { payload_size: MAX_PAYLOAD_SIZE + 1, ..config }.validate().is_err());
    }

    #[test]
    fn test_config_at_lower_limits() {
        let config = Config {
            trial_count: 1,
            concurrency: 1,
            timeout_seconds: 1,
            payload_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_urls() {
        for url in ["http://192.168.1.20:8080", "https://nas.local", "http://[fe80::1]:8080", "http://host/prefix/"] {
            let config = Config { server_url: url.into(), ..Default::default() };
            assert!(config.validate().is_ok(), "{} should be accepted", url);
        }

        for url in ["192.168.1.20:8080", "ftp://nas.local", "http://", "   "] {
            let config = Config { server_url: url.into(), ..Default::default() };
            assert!(config.validate().is_err(), "{} should be rejected", url);
        }
    }
}

/// Test how the command line and environment combine
mod layering {
    use super::*;

    #[test]
    fn test_full_command_line_to_config() {
        let cli = Cli::parse_from([
            "lst", "measure", "-s", "http://10.1.1.5:8080", "-n", "3", "-c", "2", "--payload-size", "1M",
        ]);
        let Command::Measure(args) = &cli.command else {
            panic!("expected measure subcommand");
        };

        let config = ConfigParser::new(cli.global.clone())
            .without_env_file()
            .parse_measure_with(args, lookup(&[("SERVER_URL", "http://ignored:1")]))
            .unwrap();

        assert_eq!(config.server_url, "http://10.1.1.5:8080");
        assert_eq!(config.trial_count, 3);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.payload_size, 1024 * 1024);
    }

    #[test]
    fn test_env_file_content_round_trip_through_validation() {
        let content = "SERVER_URL=http://10.0.0.9:8080\nTRIAL_COUNT=0\nCONCURRENCY=8\n";
        let warnings = EnvManager::check_env_content(content);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("TRIAL_COUNT"));
    }

    #[test]
    fn test_env_values_are_trimmed() {
        let config = ConfigParser::new(GlobalArgs::default())
            .without_env_file()
            .parse_measure_with(
                &Default::default(),
                lookup(&[("SERVER_URL", "  http://10.0.0.9:8080  "), ("CONCURRENCY", " 8 ")]),
            )
            .unwrap();

        assert_eq!(config.server_url, "http://10.0.0.9:8080");
        assert_eq!(config.concurrency, 8);
    }
}

proptest! {
    #[test]
    fn concurrency_within_limits_is_accepted(concurrency in 1u32..=MAX_CONCURRENCY) {
        let config = Config { concurrency, ..Default::default() };
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn trial_count_above_limit_is_rejected(trials in (MAX_TRIAL_COUNT + 1)..10_000u32) {
        let config = Config { trial_count: trials, ..Default::default() };
        prop_assert!(config.validate().is_err());
    }

    #[test]
    fn payload_size_env_accepts_mebibyte_suffix(mib in 1u64..=1024) {
        let value = format!("{}MiB", mib);
        let config = ConfigParser::new(GlobalArgs::default())
            .without_env_file()
            .parse_measure_with(&Default::default(), lookup(&[("PAYLOAD_SIZE", value.as_str())]))
            .unwrap();
        prop_assert_eq!(config.payload_size, mib * 1024 * 1024);
    }
}
