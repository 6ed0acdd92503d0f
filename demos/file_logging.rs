//! File logging example
//!
//! Logs to the console and to rotating JSON files under `./demo-logs`.
//! The tiny size limit forces several rotations; old files are gzipped and
//! only the newest five are kept.
//!
//! Run with: cargo run --example file_logging

use applog::prelude::*;
use std::collections::HashMap;

fn main() {
    println!("=== applog - File Logging Example ===\n");

    // Same variables a deployment would set
    let vars: HashMap<String, String> = [
        ("APP_ENV", "staging"),
        ("LOG_LEVEL", "debug"),
        ("LOG_TO_FILE", "true"),
        ("LOG_DIR", "./demo-logs"),
        ("LOG_MAX_SIZE", "2k"),
        ("LOG_MAX_FILES", "5"),
        ("LOG_COMPRESS", "true"),
        ("LOG_JSON", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let config = LoggerConfig::from_vars(&vars).with_tag("API");
    let logger = Logger::new(config);
    println!("Sinks: {:?}\n", logger.sink_names());

    logger.startup("Application starting");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");

    for i in 1..=100 {
        logger.info_with_data(
            format!("Processing item {}/100", i),
            LogContext::new().with_field("item", i),
        );
        if i % 25 == 0 {
            logger.warn_with_data(
                "Item took longer than expected",
                LogContext::new().with_field("item", i),
            );
        }
    }

    logger.ready("All items processed");
    logger.shutdown("Application stopping");

    println!("\n=== Example completed successfully! ===");
    println!("Check './demo-logs' for app-*.log and compressed app-*.log.gz files");
}
