#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use clap::Parser;
use rsyslog_exporter_core::ErrorKind;
use rsyslog_exporter_daemon::args::{parse_labels, Args};
use rsyslog_exporter_daemon::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
stats:
  export_after: 5
  down_aftr: 60 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIGURATION_INVALID");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.port, 9292);
    assert_eq!(cfg.listen_addr().unwrap().to_string(), "0.0.0.0:9292");

    let t = cfg.timeouts().unwrap();
    assert_eq!(t.export_after(), Duration::from_secs(5));
    assert_eq!(t.down_after(), Duration::from_secs(180));
    assert!(cfg.labels.is_empty());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1"
  port: 9393
stats:
  export_after: 2.5
  down_after: 30
labels:
  env: prod
  dc: ams1
"#;
    let cfg = config::load_from_str(ok).unwrap();
    assert_eq!(cfg.listen_addr().unwrap().to_string(), "127.0.0.1:9393");
    assert_eq!(cfg.timeouts().unwrap().export_after(), Duration::from_millis(2500));
    assert_eq!(cfg.labels.get("env").map(String::as_str), Some("prod"));
    assert_eq!(cfg.labels.len(), 2);
}

#[test]
fn down_after_must_exceed_export_after() {
    let bad = r#"
version: 1
stats:
  export_after: 60
  down_after: 60
"#;
    let err = config::load_from_str(bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    assert!(err.to_string().contains("down timeout"));
}

#[test]
fn unsupported_version_and_bad_listen() {
    assert!(config::load_from_str("version: 2\n").is_err());
    assert!(config::load_from_str("version: 1\nserver:\n  listen: \"localhost\"\n").is_err());
}

#[test]
fn label_names_are_checked() {
    for bad in ["name", "version", "__meta", "1abc", "with-dash", ""] {
        let err = config::validate_label_name(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid, "label {bad:?}");
    }
    for ok in ["env", "_x", "dc1", "Instance_Name"] {
        config::validate_label_name(ok).unwrap();
    }

    let bad = "version: 1\nlabels:\n  name: x\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn parse_labels_skips_malformed_items() {
    let labels = parse_labels(&["env=prod", "", "novalue", "a=b=c", " dc=ams1 "]);
    assert_eq!(labels.len(), 2);
    assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
    assert_eq!(labels.get("dc").map(String::as_str), Some("ams1"));
}

#[test]
fn flags_override_defaults() {
    let args = Args::try_parse_from([
        "rsyslog_exporter",
        "-p",
        "9000",
        "-e",
        "2",
        "-d",
        "10",
        "-L",
        "env=prod",
        "-L",
        "dc=ams1,rack=r1",
    ])
    .unwrap();

    let cfg = args.load_config().unwrap();
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.timeouts().unwrap().export_after(), Duration::from_secs(2));
    assert_eq!(cfg.timeouts().unwrap().down_after(), Duration::from_secs(10));
    assert_eq!(cfg.labels.len(), 3);
    assert_eq!(cfg.labels.get("rack").map(String::as_str), Some("r1"));
}

#[test]
fn flags_are_validated_too() {
    let args = Args {
        export_after: Some(30.0),
        down_after: Some(10.0),
        ..Default::default()
    };
    let err = args.load_config().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
}

#[test]
fn missing_config_file_is_a_config_error() {
    let args = Args {
        config: Some("/nonexistent/rsyslog_exporter.yaml".into()),
        ..Default::default()
    };
    assert_eq!(args.load_config().unwrap_err().kind(), ErrorKind::ConfigurationInvalid);
}
