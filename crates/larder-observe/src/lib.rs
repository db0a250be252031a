use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Append-only file sink. One mutex covers the whole format-write-flush
/// region, so concurrent lines never interleave and lines are totally
/// ordered.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileSink {
    fn log(&self, level: Level, message: &str) {
        let mut file = self.file.lock().expect("lock poisoned");
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        // Write failures are swallowed: the sink is best effort and has
        // nowhere else to report.
        let _ = writeln!(file, "[{stamp}] [{}] {message}", level.as_str());
        let _ = file.flush();
    }
}

#[derive(Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Test sink capturing every line in memory.
#[derive(Debug, Default, Clone)]
pub struct VecSink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl VecSink {
    pub fn snapshot(&self) -> Vec<(Level, String)> {
        self.lines.lock().expect("lock poisoned").clone()
    }
}

impl LogSink for VecSink {
    fn log(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .expect("lock poisoned")
            .push((level, message.to_string()));
    }
}
