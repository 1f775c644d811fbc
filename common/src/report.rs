//! Human readable comparison output
//!
//! The comparator never prints directly. It hands every user-facing line to a [`Reporter`] as an
//! [`Event`], which keeps the comparison logic free of process-wide output and lets tests observe
//! exactly what would have been shown.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::AsyncWriteExt;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// `dir` lacks none of the eligible names found on the other side
    NothingMissing { dir: &'a std::path::Path },
    /// `dir` lacks `count` names, followed by one [`Event::MissingEntry`] per name
    Missing {
        dir: &'a std::path::Path,
        count: usize,
    },
    MissingEntry { name: &'a std::ffi::OsStr },
    /// a copy is about to start, the line stays open until [`Event::Copied`] or
    /// [`Event::CopyFailed`] completes it
    CopyStarted { name: &'a std::ffi::OsStr },
    /// a single file was copied into the directory that lacked it
    Copied {
        name: &'a std::ffi::OsStr,
        copied: crate::copy::Copied,
    },
    CopyFailed { name: &'a std::ffi::OsStr },
}

impl Event<'_> {
    /// What follows the rendered event: nothing while a copy is in flight, a newline otherwise.
    pub fn terminator(&self) -> &'static str {
        match self {
            Event::CopyStarted { .. } => "",
            _ => "\n",
        }
    }
}

/// Throughput in MiB per second, `None` if the elapsed time is too short to measure.
pub fn throughput_mib_per_sec(bytes: u64, elapsed: std::time::Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Some(bytes as f64 / MIB / secs)
    } else {
        None
    }
}

impl std::fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Event::NothingMissing { dir } => {
                write!(f, "No files are missing in {}", dir.display())
            }
            Event::Missing { dir, count } => write!(
                f,
                "The following {} files are not found in {}:",
                count,
                dir.display()
            ),
            Event::MissingEntry { name } => write!(f, "  * {}", name.to_string_lossy()),
            Event::CopyStarted { name } => write!(f, "copying '{}'...", name.to_string_lossy()),
            Event::Copied { copied, .. } => {
                write!(f, " took {:0.2} seconds, ", copied.elapsed.as_secs_f64())?;
                match copied.throughput_mib_per_sec() {
                    Some(rate) => write!(f, "{:0.2} MiB/s", rate),
                    None => write!(
                        f,
                        "{} in no measurable time",
                        bytesize::ByteSize(copied.bytes)
                    ),
                }
            }
            Event::CopyFailed { .. } => write!(f, " failed"),
        }
    }
}

pub trait Reporter {
    fn report(
        &self,
        event: &Event<'_>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Writes reported lines to stdout and/or a log file.
#[derive(Debug, Clone)]
pub struct LogWriter {
    log_opt: Option<std::sync::Arc<tokio::sync::Mutex<tokio::io::BufWriter<tokio::fs::File>>>>,
    use_stdout: bool,
}

impl LogWriter {
    /// The log file must not exist yet.
    pub async fn new(log_path_opt: Option<&std::path::Path>, use_stdout: bool) -> Result<Self> {
        let log_opt = match log_path_opt {
            Some(log_path) => {
                let log_file = tokio::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(log_path)
                    .await
                    .with_context(|| format!("Failed to open log file: {:?}", log_path))?;
                Some(std::sync::Arc::new(tokio::sync::Mutex::new(
                    tokio::io::BufWriter::new(log_file),
                )))
            }
            None => None,
        };
        Ok(Self {
            log_opt,
            use_stdout,
        })
    }

    fn write_stdout(msg: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(msg.as_bytes())
            .and_then(|_| stdout.flush())
            .context("Failed to write to stdout")
    }

    async fn write(&self, msg: &str) -> Result<()> {
        if self.use_stdout {
            Self::write_stdout(msg)?;
        }
        if let Some(log) = &self.log_opt {
            let mut log = log.lock().await;
            log.write_all(msg.as_bytes())
                .await
                .context("Failed to write to log file")?;
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        if let Some(log) = &self.log_opt {
            let mut log = log.lock().await;
            log.flush().await.context("Failed to flush log file")?;
        }
        Ok(())
    }
}

impl Reporter for LogWriter {
    async fn report(&self, event: &Event<'_>) -> Result<()> {
        self.write(&format!("{}{}", event, event.terminator())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils;
    use std::ffi::OsStr;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn formats_listing_lines() {
        let dir = Path::new("/media/films");
        assert_eq!(
            Event::NothingMissing { dir }.to_string(),
            "No files are missing in /media/films"
        );
        assert_eq!(
            Event::Missing { dir, count: 2 }.to_string(),
            "The following 2 files are not found in /media/films:"
        );
        assert_eq!(
            Event::MissingEntry {
                name: OsStr::new("a.txt")
            }
            .to_string(),
            "  * a.txt"
        );
    }

    fn copied(bytes: u64, elapsed: Duration) -> crate::copy::Copied {
        crate::copy::Copied { bytes, elapsed }
    }

    #[test]
    fn formats_copy_throughput() {
        let name = OsStr::new("big.bin");
        let line = format!(
            "{}{}",
            Event::CopyStarted { name },
            Event::Copied {
                name,
                copied: copied(10 * 1024 * 1024, Duration::from_secs(2)),
            }
        );
        assert_eq!(line, "copying 'big.bin'... took 2.00 seconds, 5.00 MiB/s");
        assert_eq!(Event::CopyStarted { name }.terminator(), "");
        assert_eq!(Event::CopyFailed { name }.terminator(), "\n");
    }

    #[test]
    fn zero_elapsed_has_no_throughput() {
        assert_eq!(throughput_mib_per_sec(1024, Duration::ZERO), None);
        let line = Event::Copied {
            name: OsStr::new("tiny"),
            copied: copied(0, Duration::ZERO),
        }
        .to_string();
        assert!(line.starts_with(" took 0.00 seconds, "));
        assert!(line.ends_with("in no measurable time"));
    }

    #[tokio::test]
    async fn log_writer_writes_to_file() -> Result<()> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let log_path = tmp_dir.join("cmp.log");
        let log = LogWriter::new(Some(log_path.as_path()), false).await?;
        log.report(&Event::NothingMissing {
            dir: Path::new("src"),
        })
        .await?;
        log.report(&Event::Missing {
            dir: Path::new("dst"),
            count: 1,
        })
        .await?;
        log.report(&Event::MissingEntry {
            name: OsStr::new("x"),
        })
        .await?;
        log.report(&Event::CopyStarted {
            name: OsStr::new("x"),
        })
        .await?;
        log.report(&Event::CopyFailed {
            name: OsStr::new("x"),
        })
        .await?;
        log.flush().await?;
        let content = tokio::fs::read_to_string(&log_path).await?;
        assert_eq!(
            content,
            "No files are missing in src\nThe following 1 files are not found in dst:\n  * x\n\
             copying 'x'... failed\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn log_writer_refuses_existing_file() -> Result<()> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let log_path = tmp_dir.join("cmp.log");
        tokio::fs::write(&log_path, "keep me").await?;
        assert!(LogWriter::new(Some(log_path.as_path()), false).await.is_err());
        assert_eq!(tokio::fs::read_to_string(&log_path).await?, "keep me");
        Ok(())
    }
}
