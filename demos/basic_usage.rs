//! Basic logger usage example
//!
//! Demonstrates the console sink, levels, structured data and child loggers.
//!
//! Run with: cargo run --example basic_usage

use applog::prelude::*;
use applog::{fields, info};
use std::time::Duration;

fn main() {
    println!("=== applog - Basic Usage Example ===\n");

    // Development defaults: fancy colored console, debug level
    let logger = Logger::new(LoggerConfig::default().with_tag("demo"));

    println!("1. Logging at different levels:");
    logger.trace("This is a trace message (hidden at debug level)");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.fatal("This is a fatal message");

    println!("\n2. Structured data and context:");
    logger.set_context(fields! { "service" => "billing" });
    logger.info_with_data("Invoice created", fields! { "invoice_id" => 1042, "amount" => 99.5 });
    info!(logger, "Processed {} invoices", 3);

    let worker = logger.child(fields! { "worker" => 1 });
    worker.info("Child loggers carry the parent's context plus their own");

    println!("\n3. Errors:");
    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "rates.csv");
    logger.error_with("Could not load exchange rates", &err, fields! { "retry" => true });

    println!("\n4. Specialized helpers:");
    logger.database("SELECT * FROM invoices WHERE id = $1", Duration::from_millis(4), true);
    logger.performance("render_pdf", Duration::from_millis(240));

    logger.shutdown("Demo finished");
    println!("\n=== Example completed successfully! ===");
}
