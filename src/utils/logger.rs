//! Logger utility for application-wide logging
//!
//! A run log file for the pipeline's own records, plus a global `log`
//! backend that copies every record to a file and hands it on to an
//! `env_logger` console logger (so `RUST_LOG` still works).

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use env_logger::Env;
use log::{LevelFilter, Log, Metadata, Record};

/// Custom logger implementation
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Console logger records are forwarded to
    console: Option<env_logger::Logger>,
    /// Most detailed level written to the file
    file_level: LevelFilter,
}

impl Logger {
    /// Creates a new logger instance
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new<P: AsRef<Path>>(log_file: P) -> io::Result<Self> {
        let file = File::create(log_file.as_ref())?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            console: None,
            file_level: LevelFilter::Debug,
        })
    }

    /// Logs a message to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                writeln!(file, "{}", message)?;
                file.flush()?;
            }
        }
        Ok(())
    }

    /// Logs a titled block of `key: value` lines
    pub fn log_section(&self, title: &str, entries: &[(&str, String)]) -> io::Result<()> {
        self.log(&format!("{}:", title))?;
        for (key, value) in entries {
            self.log(&format!("  {}: {}", key, value))?;
        }
        Ok(())
    }

    /// Static method to initialize the global logger
    ///
    /// # Arguments
    ///
    /// * `log_file` - File receiving every record
    /// * `verbose` - Show debug records on the console unless `RUST_LOG` says otherwise
    pub fn init_global_logger(log_file: &str, verbose: bool) -> io::Result<()> {
        let default_filter = if verbose { "debug" } else { "info" };
        let console = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).build();
        let max_level = console.filter().max(LevelFilter::Debug);

        let mut global_logger = Logger::new(log_file)?;
        global_logger.console = Some(console);

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.file_level
            || self.console.as_ref().map(|c| c.enabled(metadata)).unwrap_or(false)
    }

    fn log(&self, record: &Record) {
        if record.level() <= self.file_level {
            let message = format!("[{}] {}: {}", record.level(), record.target(), record.args());
            let _ = Logger::log(self, &message);
        }

        if let Some(console) = &self.console {
            if console.matches(record) {
                console.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Some(console) = &self.console {
            console.flush();
        }
    }
}
