use anyhow::{anyhow, Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::preserve;
use crate::report;
use crate::timer::Timer;

/// Outcome of a single successful file copy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Copied {
    pub bytes: u64,
    /// time spent copying data and applying metadata
    pub elapsed: std::time::Duration,
}

impl Copied {
    pub fn throughput_mib_per_sec(&self) -> Option<f64> {
        report::throughput_mib_per_sec(self.bytes, self.elapsed)
    }
}

/// Await `work` and remove `dst` if it failed, so an incomplete file is never left behind.
async fn remove_on_error<T>(
    dst: &std::path::Path,
    work: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match work.await {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::debug!("removing incomplete {:?}", dst);
            if let Err(remove_error) = tokio::fs::remove_file(dst).await {
                tracing::warn!("cannot remove incomplete {:?}: {}", dst, remove_error);
            }
            Err(error)
        }
    }
}

/// Copy one regular file to a path that must not exist yet and apply the source metadata.
///
/// Symlinks are followed. The destination is created exclusively, so a file that appeared since
/// the directories were listed is never overwritten. If copying data or metadata fails the
/// destination is removed again.
#[instrument]
pub async fn copy_file(
    src: &std::path::Path,
    dst: &std::path::Path,
    preserve: &preserve::Settings,
) -> Result<Copied> {
    tracing::debug!("reading 'src' metadata");
    let src_metadata = tokio::fs::metadata(src)
        .await
        .with_context(|| format!("failed reading metadata from {:?}", &src))?;
    if !src_metadata.is_file() {
        return Err(anyhow!("{:?} is not a regular file", src));
    }
    let mut reader = tokio::fs::File::open(src)
        .await
        .with_context(|| format!("cannot open {:?} for reading", &src))?;
    let writer = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .await
    {
        Ok(writer) => writer,
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(anyhow!("destination {:?} already exists", dst));
        }
        Err(error) => {
            return Err(error).with_context(|| format!("cannot create {:?}", &dst));
        }
    };
    let mut timer = Timer::start(format!("copying {:?}", src));
    let res = remove_on_error(dst, async {
        let mut writer = writer;
        tracing::debug!("copying data");
        let bytes = tokio::io::copy(&mut reader, &mut writer)
            .await
            .context("failed copying data")?;
        writer.flush().await.context("failed copying data")?;
        drop(writer);
        tracing::debug!("setting metadata");
        preserve::set_file_metadata(preserve, &src_metadata, dst).await?;
        Ok::<u64, anyhow::Error>(bytes)
    })
    .await;
    match res {
        Ok(bytes) => Ok(Copied {
            bytes,
            elapsed: timer.stop(),
        }),
        Err(error) => {
            timer.discard();
            Err(error)
        }
    }
}
