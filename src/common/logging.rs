//! Logging and tracing configuration
//!
//! Progress lines meant for the operator are printed directly; tracing carries
//! diagnostics such as spawned commands and individual benchmark samples.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies. With `log_file`, logs are also appended to that file.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) {
    let default_directives = if verbose {
        "obrc_harness=debug,warn"
    } else {
        "obrc_harness=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file = log_file.and_then(file_layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file)
        .init();
}

/// Build a plain-text layer appending to `path`
fn file_layer<S>(path: &Path) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    let file_name = path.file_name()?;

    if let Some(dir) = dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory: {}", e);
            return None;
        }
    }

    let appender =
        tracing_appender::rolling::never(dir.unwrap_or_else(|| Path::new(".")), file_name);

    Some(
        fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    )
}
