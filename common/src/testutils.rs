use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

pub async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    // tests run in parallel, start probing from a per-process counter
    let mut idx = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
    loop {
        let tmp_dir =
            std::env::temp_dir().join(format!("rdcmp_test{}_{}", std::process::id(), &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx = NEXT_DIR.fetch_add(1, Ordering::Relaxed);
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

/// Create `src` and `dst` directories under a fresh temporary directory, each populated with
/// the given files (content is the file name).
pub async fn setup_test_dirs(
    src_files: &[&str],
    dst_files: &[&str],
) -> anyhow::Result<std::path::PathBuf> {
    let tmp_dir = create_temp_dir().await?;
    for (dir, files) in [("src", src_files), ("dst", dst_files)] {
        let dir_path = tmp_dir.join(dir);
        tokio::fs::create_dir(&dir_path).await?;
        for file in files {
            tokio::fs::write(dir_path.join(file), file).await?;
        }
    }
    Ok(tmp_dir)
}

pub async fn list_names(dir: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = vec![];
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Collects reported output in memory, joined the way a terminal would show it.
#[derive(Debug, Default)]
pub struct Recorder {
    text: std::sync::Mutex<String>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<String> {
        self.text
            .lock()
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl crate::report::Reporter for Recorder {
    async fn report(&self, event: &crate::report::Event<'_>) -> anyhow::Result<()> {
        let mut text = self.text.lock().unwrap();
        text.push_str(&event.to_string());
        text.push_str(event.terminator());
        Ok(())
    }
}
