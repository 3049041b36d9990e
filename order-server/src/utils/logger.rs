//! Logging Infrastructure
//!
//! - Console output, pretty or JSON
//! - Daily rotating server logs (deleted after 14 days)
//! - Audit logs under target `audit` (payments, manual settlements), never deleted

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Server log file prefix, files are `server.YYYY-MM-DD`
const SERVER_LOG_PREFIX: &str = "server";
const AUDIT_LOG_PREFIX: &str = "audit";
const RETENTION_DAYS: i64 = 14;

type Base = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// Clean up server log files older than 14 days. Audit logs are kept.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let cutoff = (chrono::Local::now() - chrono::Duration::days(RETENTION_DAYS)).date_naive();
    let server_dir = log_dir.join(SERVER_LOG_PREFIX);
    if !server_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(server_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(date_part) = name.strip_prefix("server.") else {
            continue;
        };
        if let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            removed += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }
    Ok(removed)
}

fn file_layer(dir: &Path, prefix: &str, json_format: bool, audit: bool) -> BoxedLayer {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, prefix);
    let by_target = tracing_subscriber::filter::filter_fn(move |meta| {
        (meta.target() == "audit") == audit
    });
    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(by_target)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(by_target)
            .boxed()
    }
}

/// Initialize the logging system
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug"); `RUST_LOG` takes precedence
/// * `json_format` - JSON output (production) or pretty output (development)
/// * `log_dir` - Optional directory for file logging
///
/// # Examples
/// ```no_run
/// // Development setup (console only)
/// order_server::utils::init_logger("debug", false, None)?;
///
/// // Production setup (console + file)
/// order_server::utils::init_logger("info", true, Some("./data/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if json_format {
        layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        );
    }

    if let Some(dir) = log_dir {
        let log_dir = Path::new(dir);
        let server_dir = log_dir.join(SERVER_LOG_PREFIX);
        let audit_dir = log_dir.join(AUDIT_LOG_PREFIX);
        fs::create_dir_all(&server_dir)?;
        fs::create_dir_all(&audit_dir)?;

        layers.push(file_layer(&server_dir, SERVER_LOG_PREFIX, json_format, false));
        layers.push(file_layer(&audit_dir, AUDIT_LOG_PREFIX, json_format, true));

        if let Err(e) = cleanup_old_logs(log_dir) {
            eprintln!("Failed to cleanup old logs: {e}");
        }
        tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;
    Ok(())
}

/// Periodic cleanup task - runs every hour to clean old logs
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, sleep};

    loop {
        sleep(Duration::from_secs(3600)).await;
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

/// Audit log helper - records payment and settlement decisions
///
/// # Examples
/// ```no_run
/// order_server::audit_log!("payment", "confirm", "order:12", "intent pi_123 succeeded");
/// ```
#[macro_export]
macro_rules! audit_log {
    ($actor:expr, $action:expr, $resource:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
    ($actor:expr, $action:expr, $resource:expr, $details:expr) => {
        tracing::info!(
            target: "audit",
            actor = $actor,
            action = $action,
            resource = $resource,
            details = $details,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}
