//! Structured logging on top of the `log` facade
//!
//! Configure once at startup, then use `log::info!` and friends anywhere.
//!
//! ```rust,no_run
//! use gestionaph_core::logging::{init_logging, LoggingConfig};
//!
//! let config = LoggingConfig::production().with_context_field("service", "gestionaph");
//! init_logging(&config)?;
//! log::info!("Portal listening on {}", "127.0.0.1:8080");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod destinations;
pub mod formatter;

pub use config::{LogLevel, LoggingConfig};
pub use destinations::{LogEntry, LogOutput};
pub use formatter::LogFormat;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

/// Install the portal logger as the global `log` backend.
///
/// Only the first call has an effect; it fails if a different logger
/// (e.g. [`init_env_logger`]) was installed first.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut outcome = Ok(());
    INIT.call_once(|| {
        outcome = PortalLogger::new(config.clone()).and_then(|logger| {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(config.level.to_filter());
            Ok(())
        });
    });
    outcome
}

/// `env_logger` driven by `RUST_LOG`, for tools and tests that do not load a config
pub fn init_env_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}

struct PortalLogger {
    config: LoggingConfig,
    writers: Vec<Writer>,
}

enum Writer {
    Stdout(LogFormat),
    Stderr(LogFormat),
    File { format: LogFormat, file: Mutex<File> },
}

impl PortalLogger {
    fn new(config: LoggingConfig) -> anyhow::Result<Self> {
        let mut writers = Vec::new();

        for output in &config.outputs {
            let writer = match output {
                LogOutput::Stdout { format } => {
                    Writer::Stdout(format.clone().unwrap_or_else(|| config.format.clone()))
                }
                LogOutput::Stderr { format } => {
                    Writer::Stderr(format.clone().unwrap_or_else(|| config.format.clone()))
                }
                LogOutput::File { path } => Writer::File {
                    format: config.format.clone(),
                    file: Mutex::new(open_log_file(Path::new(path))?),
                },
            };
            writers.push(writer);
        }

        if writers.is_empty() {
            writers.push(Writer::Stdout(config.format.clone()));
        }

        Ok(Self { config, writers })
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

impl Writer {
    fn write(&self, entry: &LogEntry) -> io::Result<()> {
        match self {
            Writer::Stdout(format) => writeln!(io::stdout().lock(), "{}", format.format_entry(entry)),
            Writer::Stderr(format) => writeln!(io::stderr().lock(), "{}", format.format_entry(entry)),
            Writer::File { format, file } => {
                let line = format.format_entry(entry);
                match file.lock() {
                    Ok(mut file) => writeln!(file, "{}", line),
                    Err(_) => Err(io::Error::other("log file lock poisoned")),
                }
            }
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Writer::Stdout(_) => io::stdout().flush(),
            Writer::Stderr(_) => io::stderr().flush(),
            Writer::File { file, .. } => match file.lock() {
                Ok(mut file) => file.flush(),
                Err(_) => Ok(()),
            },
        }
    }
}

impl log::Log for PortalLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::from(self.config.level)
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_log_record(record, &self.config);
        for writer in &self.writers {
            let _ = writer.write(&entry);
        }
    }

    fn flush(&self) {
        for writer in &self.writers {
            let _ = writer.flush();
        }
    }
}
