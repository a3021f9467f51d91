use dynconf_logger::{FileSettings, LogSettings, Logger, LoggerError, RotationKind};
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
#[serial]
fn settings_driven_file_logging_then_second_init_fails() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let settings = LogSettings {
        console: false,
        file: Some(FileSettings {
            rotation: RotationKind::Never,
            json: true,
            ..FileSettings::new(&log_dir)
        }),
        ..LogSettings::default()
    };
    let logger = Logger::from_settings("integration-file-logging", settings)?;
    assert!(logger.has_file_output());

    tracing::info!(slot = "degrade", "First value received");

    let err = Logger::builder("integration-second").init().expect_err("second init should fail");
    assert!(matches!(err, LoggerError::Subscriber { .. }), "expected subscriber error, got {err}");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let line = contents.lines().find(|l| l.contains("First value received")).expect("event logged");
    let event: serde_json::Value = serde_json::from_str(line)?;
    assert_eq!(event["fields"]["slot"], "degrade");

    Ok(())
}
