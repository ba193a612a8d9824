//! Logging setup.
//!
//! Log lines go to stderr, or to a file when one is configured. While the
//! terminal surface owns the screen, console output is dropped so it cannot
//! scribble over the alternate screen.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, OptionalWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static CONSOLE_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Held by whatever owns the terminal; console logging is muted until it
/// is dropped
pub struct ConsoleClaim(());

impl ConsoleClaim {
    pub fn acquire() -> Self {
        CONSOLE_CLAIMED.store(true, Ordering::Release);
        Self(())
    }
}

impl Drop for ConsoleClaim {
    fn drop(&mut self) {
        CONSOLE_CLAIMED.store(false, Ordering::Release);
    }
}

/// stderr, unless the console is claimed
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleWriter;

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = OptionalWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        if CONSOLE_CLAIMED.load(Ordering::Acquire) {
            OptionalWriter::none()
        } else {
            OptionalWriter::some(io::stderr())
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize tracing/logging
///
/// Default level is "warn"; --verbose switches to "debug". `RUST_LOG`
/// overrides both.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("signage_display={}", level).into());

    let (writer, ansi, file_error) = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => (BoxMakeWriter::new(Mutex::new(file)), false, None),
        Some((path, Err(e))) => (BoxMakeWriter::new(ConsoleWriter), true, Some((path, e))),
        None => (BoxMakeWriter::new(ConsoleWriter), true, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .init();

    if let Some((path, e)) = file_error {
        tracing::warn!("Failed to open log file {}: {}", path.display(), e);
    }
}
