use bazaar_logger::{FileOutput, LevelFilter, Logger, parse_rotation};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_output_writes_one_object_per_line() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("bazaar-file-logging")
        .console(false)
        .level(LevelFilter::INFO)
        .file(FileOutput::new(&log_dir).rotation(parse_rotation("never")?).max_files(2).json(true))
        .env_filter("info")
        .init()?;

    assert_eq!(logger.directory(), Some(log_dir.as_path()));
    tracing::info!(item_id = "it-42", "listing published");
    tracing::debug!("filtered out by level");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let lines: Vec<&str> = contents.lines().filter(|l| l.contains("listing published")).collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with('{') && lines[0].ends_with('}'));
    assert!(lines[0].contains("it-42"));
    assert!(!contents.contains("filtered out by level"));

    Ok(())
}
