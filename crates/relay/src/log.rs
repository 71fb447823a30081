//! Per-job log: bounded tail, full on-disk copy, and live broadcast.

use {
    courier_common::text::{tail_lines, truncate_chars},
    courier_config::LogsConfig,
    serde::{Deserialize, Serialize},
    std::{
        collections::VecDeque,
        fmt,
        fs::{File, OpenOptions},
        io::{BufWriter, Write},
        path::{Path, PathBuf},
        sync::Mutex,
    },
    tokio::sync::broadcast,
    tracing::{error, info, warn},
};

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// One line as published to live observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub job_id: String,
    pub ts: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    fn render(&self) -> String {
        format!("{} {:<5} {}", self.ts, self.level, self.message)
    }
}

/// Log of one pipeline run.
pub struct JobLog {
    job_id: String,
    tail: Mutex<VecDeque<String>>,
    tail_lines: usize,
    line_max_chars: usize,
    tx: broadcast::Sender<LogLine>,
    writer: Mutex<Option<BufWriter<File>>>,
    file_path: PathBuf,
}

impl JobLog {
    /// Open `<log_dir>/job-<job_id>.log` for appending.
    ///
    /// Lines are buffered; they reach the file on [`JobLog::flush`] or when
    /// the log is dropped. A log file that cannot be opened only disables the
    /// on-disk copy.
    pub fn new(job_id: &str, log_dir: &Path, config: &LogsConfig) -> Self {
        let file_path = log_dir.join(format!("job-{job_id}.log"));
        let writer = std::fs::create_dir_all(log_dir)
            .and_then(|()| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&file_path)
            })
            .inspect_err(|e| {
                warn!(job_id, path = %file_path.display(), error = %e, "job log file unavailable");
            })
            .ok()
            .map(BufWriter::new);
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            job_id: job_id.to_string(),
            tail: Mutex::new(VecDeque::with_capacity(config.tail_lines)),
            tail_lines: config.tail_lines,
            line_max_chars: config.line_max_chars,
            tx,
            writer: Mutex::new(writer),
            file_path,
        }
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Follow lines as they are written.
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.tx.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    /// Copy the last `max_lines` lines of a tool transcript into the log.
    pub fn transcript(&self, tool: &str, transcript: &str, max_lines: usize) {
        for line in tail_lines(transcript, max_lines) {
            self.push(LogLevel::Info, format!("{tool}: {line}"));
        }
    }

    /// Push buffered lines to the log file.
    pub fn flush(&self) {
        if let Ok(mut guard) = self.writer.lock()
            && let Some(writer) = guard.as_mut()
            && let Err(e) = writer.flush()
        {
            warn!(job_id = %self.job_id, error = %e, "job log flush failed");
            *guard = None;
        }
    }

    /// The most recent lines, oldest first, each truncated.
    #[must_use]
    pub fn tail(&self) -> Vec<String> {
        self.tail
            .lock()
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(job_id = %self.job_id, "{message}"),
            LogLevel::Warn => warn!(job_id = %self.job_id, "{message}"),
            LogLevel::Error => error!(job_id = %self.job_id, "{message}"),
        }

        let line = LogLine {
            job_id: self.job_id.clone(),
            ts: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            level,
            message,
        };
        let rendered = line.render();

        if let Ok(mut guard) = self.writer.lock()
            && let Some(writer) = guard.as_mut()
            && let Err(e) = writeln!(writer, "{rendered}")
        {
            warn!(job_id = %self.job_id, error = %e, "job log write failed");
            *guard = None;
        }

        if self.tail_lines > 0
            && let Ok(mut tail) = self.tail.lock()
        {
            if tail.len() >= self.tail_lines {
                tail.pop_front();
            }
            tail.push_back(truncate_chars(&rendered, self.line_max_chars));
        }

        let _ = self.tx.send(line);
    }
}
