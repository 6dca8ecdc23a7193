//! Append-only text trail with console echo

use super::event_sink::{format_line, EventSink, SinkError, SinkStats};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct TextTrailSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    echo: bool,
    lines_written: u64,
    write_failures: u64,
    write_error_logged: bool,
}

impl TextTrailSink {
    /// Open the trail file, truncating it when `truncate` is set
    pub fn create(path: impl AsRef<Path>, truncate: bool) -> Result<Self, SinkError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = Self::open_file(path, truncate)?;

        log::info!("📝 Writing event trail to: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(BufWriter::new(file)),
            echo: true,
            lines_written: 0,
            write_failures: 0,
            write_error_logged: false,
        })
    }

    /// Open the trail, falling back to console-only output if the file
    /// cannot be opened
    pub fn open_or_console(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::create(path, true) {
            Ok(sink) => sink,
            Err(e) => {
                log::error!(
                    "❌ Cannot open event trail {} ({}), continuing with console output only",
                    path.display(),
                    e
                );
                Self {
                    path: path.to_path_buf(),
                    file: None,
                    echo: true,
                    lines_written: 0,
                    write_failures: 0,
                    write_error_logged: true,
                }
            }
        }
    }

    /// Disable the stdout echo (tests, quiet mode)
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Lines that reached the console but not the trail file
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn is_persistent(&self) -> bool {
        self.file.is_some()
    }

    fn open_file(path: &Path, truncate: bool) -> std::io::Result<File> {
        if truncate {
            File::create(path)
        } else {
            OpenOptions::new().create(true).append(true).open(path)
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Closed)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for TextTrailSink {
    async fn record(&mut self, timestamp: DateTime<Local>, message: &str) {
        let line = format_line(timestamp, message);

        if self.echo {
            println!("{}", line);
        }

        if self.file.is_none() {
            return;
        }

        match self.write_line(&line) {
            Ok(()) => self.lines_written += 1,
            Err(e) => {
                self.write_failures += 1;
                if !self.write_error_logged {
                    self.write_error_logged = true;
                    log::error!(
                        "❌ Failed to write event trail {}: {} (console output continues)",
                        self.path.display(),
                        e
                    );
                }
            }
        }
    }

    fn clear(&mut self) -> Result<(), SinkError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        let file = Self::open_file(&self.path, true)?;
        self.file = Some(BufWriter::new(file));
        self.lines_written = 0;
        self.write_failures = 0;
        self.write_error_logged = false;
        Ok(())
    }

    fn stats(&self) -> Result<SinkStats, SinkError> {
        if !self.path.exists() {
            return Ok(SinkStats::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        Ok(SinkStats {
            line_count: contents.lines().count() as u64,
            size_bytes: contents.len() as u64,
        })
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            log::info!(
                "📝 Event trail closed ({} lines written to {})",
                self.lines_written,
                self.path.display()
            );
        }
        if self.write_failures > 0 {
            log::warn!(
                "⚠️  {} event trail lines were only written to the console",
                self.write_failures
            );
        }
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "TEXT"
    }
}

impl Drop for TextTrailSink {
    fn drop(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}
