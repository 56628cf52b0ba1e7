//! Console plus rotating log files for unattended runs.
//!
//! Records go to stderr through `env_logger`. When a log directory is
//! configured they are also appended to `drivesort.log`, and errors are
//! copied to `drivesort_err.log`. Both files rotate by size and keep a fixed
//! number of numbered backups (`drivesort.log.1` is the newest).

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MAIN_LOG_FILE: &str = "drivesort.log";
pub const ERROR_LOG_FILE: &str = "drivesort_err.log";

/// Append-only file that is renamed to `<name>.1` once it would exceed `max_bytes`.
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            backups,
            file,
            written,
        })
    }

    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }

        writeln!(self.file, "{}", line)?;
        self.written += len;
        Ok(())
    }

    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups == 0 {
            self.file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

struct LogFiles {
    level: LevelFilter,
    main: Mutex<RotatingFile>,
    errors: Mutex<RotatingFile>,
}

pub struct RunLogger {
    console: Option<env_logger::Logger>,
    files: Option<LogFiles>,
}

impl RunLogger {
    /// File-only logger, used when stderr output is not wanted.
    pub fn files_only(settings: &LoggingConfig, dir: &Path, level: LevelFilter) -> Result<Self> {
        Ok(Self {
            console: None,
            files: Some(open_files(settings, dir, level)?),
        })
    }

    pub fn max_level(&self) -> LevelFilter {
        let console = self.console.as_ref().map(|c| c.filter()).unwrap_or(LevelFilter::Off);
        let files = self.files.as_ref().map(|f| f.level).unwrap_or(LevelFilter::Off);
        console.max(files)
    }
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if let Some(console) = &self.console {
            if console.matches(record) {
                console.log(record);
            }
        }

        let files = match &self.files {
            Some(files) => files,
            None => return,
        };
        if record.level() > files.level {
            return;
        }

        let line = format_line(record);
        if let Ok(mut main) = files.main.lock() {
            let _ = main.write_line(&line);
        }
        if record.level() == Level::Error {
            if let Ok(mut errors) = files.errors.lock() {
                let _ = errors.write_line(&line);
            }
        }
    }

    fn flush(&self) {
        if let Some(console) = &self.console {
            console.flush();
        }
        if let Some(files) = &self.files {
            if let Ok(mut main) = files.main.lock() {
                let _ = main.flush();
            }
            if let Ok(mut errors) = files.errors.lock() {
                let _ = errors.flush();
            }
        }
    }
}

/// `2024-11-26 12:58:01,042 - INFO - message`
pub fn format_line(record: &Record) -> String {
    format!(
        "{} - {} - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
        record.level(),
        record.args()
    )
}

fn open_files(settings: &LoggingConfig, dir: &Path, level: LevelFilter) -> Result<LogFiles> {
    let main = RotatingFile::open(&dir.join(MAIN_LOG_FILE), settings.max_file_size, settings.backups)
        .with_context(|| format!("Failed to open {} in {}", MAIN_LOG_FILE, dir.display()))?;
    let errors = RotatingFile::open(&dir.join(ERROR_LOG_FILE), settings.max_file_size, settings.backups)
        .with_context(|| format!("Failed to open {} in {}", ERROR_LOG_FILE, dir.display()))?;

    Ok(LogFiles {
        level,
        main: Mutex::new(main),
        errors: Mutex::new(errors),
    })
}

/// Install the global logger. `console_level` is the stderr default and is
/// overridden by `RUST_LOG`; files record at info, or debug when verbose.
pub fn init(console_level: LevelFilter, settings: &LoggingConfig) -> Result<()> {
    let console = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(console_level.to_string()),
    )
    .build();

    let file_level = console_level.max(LevelFilter::Info);
    let files = match &settings.log_dir {
        Some(dir) => Some(open_files(settings, dir, file_level)?),
        None => None,
    };

    let logger = RunLogger {
        console: Some(console),
        files,
    };
    let max_level = logger.max_level();

    log::set_boxed_logger(Box::new(logger)).context("Logger already initialised")?;
    log::set_max_level(max_level);
    Ok(())
}
