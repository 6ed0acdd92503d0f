//! Request tracking example
//!
//! Shows the calls an HTTP middleware makes around each request, first with
//! the raw tracking API and then with a `RequestScope` guard. The global
//! logger is used so handlers can reach it without plumbing.
//!
//! Run with: cargo run --example request_tracking

use applog::global;
use applog::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

fn handle(path: &str) -> std::result::Result<u16, String> {
    thread::sleep(Duration::from_millis(15));
    match path {
        "/missing" => Ok(404),
        "/boom" => Err("database unavailable".to_string()),
        _ => Ok(200),
    }
}

/// What a middleware does with the explicit API
fn middleware(logger: &Logger, method: &str, path: &str) {
    let started = Instant::now();
    let request_id = format!("manual-{}", path.trim_start_matches('/'));

    logger.start_request(&request_id);
    logger.request(
        format!("{} {} | IP: 127.0.0.1 | UA: demo", method, path),
        &request_id,
    );

    match handle(path) {
        Ok(status) => {
            logger.response(
                format!(
                    "Response sent: {} | Duration: {}ms",
                    status,
                    started.elapsed().as_millis()
                ),
                &request_id,
            );
            logger.http(&HttpRequestSummary::new(method, path, status, started.elapsed()));
            logger.end_request(&request_id, status);
        }
        Err(message) => {
            logger.error_with_data(
                format!("Request failed: {}", message),
                LogContext::new().with_field("request_id", request_id.as_str()),
            );
            logger.end_request(&request_id, 500);
        }
    }
}

fn main() {
    println!("=== applog - Request Tracking Example ===\n");

    let logger = global::initialize(LoggerConfig::default().with_tag("API"));
    logger.startup("Server starting");

    println!("1. Explicit tracking calls:");
    for path in ["/users", "/missing", "/boom"] {
        middleware(&logger, "GET", path);
    }

    println!("\n2. Scope guards on worker threads:");
    let workers: Vec<_> = (0..3)
        .map(|n| {
            thread::spawn(move || {
                let logger = global::logger();
                let scope = logger.begin_request();
                scope.request(format!("POST /orders/{}", n));
                scope.logger().debug("Validating order");
                thread::sleep(Duration::from_millis(10 * (n + 1)));
                scope.response("Response sent: 201");
                scope.finish(201);
            })
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }

    println!("\nPending requests: {}", logger.pending_requests());
    global::shutdown("Server stopping");
    println!("\n=== Example completed successfully! ===");
}
