// Installs the global subscriber, so this binary holds a single test.

use liquiscrape::handlers::log_fatal;
use liquiscrape::logging::{LOG_FILE_NAME, init_logging};
use tempfile::TempDir;

#[test]
fn test_fatal_error_reaches_log_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let guard = init_logging(dir.path(), true)?;

    let error = anyhow::anyhow!("No valid URLs found in players.csv");
    log_fatal(&error, Some(guard), true);

    let mut logged = String::new();
    for entry in std::fs::read_dir(dir.path())? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(LOG_FILE_NAME) {
            logged.push_str(&std::fs::read_to_string(entry.path())?);
        }
    }
    assert!(logged.contains("ERROR"), "log was: {}", logged);
    assert!(logged.contains("No valid URLs found in players.csv"));
    Ok(())
}
