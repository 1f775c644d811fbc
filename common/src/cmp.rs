use enum_map::{enum_map, Enum, EnumMap};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{event, instrument, Level};

use crate::copy;
use crate::filter;
use crate::preserve;
use crate::report::{Event, Reporter};

/// One of the two compared directories
#[derive(Copy, Clone, Debug, Enum, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Source => Side::Destination,
            Side::Destination => Side::Source,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Settings {
    /// copy files found only in the source into the destination
    pub copy_missing_to_destination: bool,
    /// copy files found only in the destination into the source
    pub copy_missing_to_source: bool,
    pub preserve: preserve::Settings,
}

impl Settings {
    /// Whether files missing in `side` should be copied into it.
    pub fn copies_into(&self, side: Side) -> bool {
        match side {
            Side::Source => self.copy_missing_to_source,
            Side::Destination => self.copy_missing_to_destination,
        }
    }
}

/// Per-side results, keyed by the directory that lacks the files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// `missing[Side::Source]` holds names found only in the destination
    pub missing: EnumMap<Side, Vec<OsString>>,
    pub files_copied: EnumMap<Side, usize>,
    pub bytes_copied: EnumMap<Side, u64>,
}

impl Summary {
    pub fn only_in_source(&self) -> &[OsString] {
        &self.missing[Side::Destination]
    }

    pub fn only_in_destination(&self) -> &[OsString] {
        &self.missing[Side::Source]
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (side, name) in [(Side::Source, "source"), (Side::Destination, "destination")] {
            writeln!(f, "missing in {}: {}", name, self.missing[side].len())?;
            writeln!(f, "files copied to {}: {}", name, self.files_copied[side])?;
            writeln!(
                f,
                "bytes copied to {}: {}",
                name,
                bytesize::ByteSize(self.bytes_copied[side])
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("directory {path:?} does not exist")]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} is not a directory")]
    NotADirectory { path: PathBuf },
    #[error("cannot read directory {path:?}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed copying {src:?} to {dst:?}")]
    CopyFailed {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed reporting comparison results")]
    ReportFailed(#[source] anyhow::Error),
}

/// Error type for comparison that preserves the summary of the work done before failing.
///
/// Display and source delegate to [`ErrorKind`], so the full chain shows with `{:#}`.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub summary: Box<Summary>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, summary: Summary) -> Self {
        Error {
            kind,
            summary: Box::new(summary),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

/// Names of the entries directly under `path`, in the order the OS returns them.
#[instrument]
pub async fn list_dir(path: &Path) -> Result<Vec<OsString>, ErrorKind> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(source) => {
            return Err(match source.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::DirectoryNotFound {
                    path: path.to_owned(),
                    source,
                },
                std::io::ErrorKind::NotADirectory => ErrorKind::NotADirectory {
                    path: path.to_owned(),
                },
                _ => ErrorKind::DirectoryUnreadable {
                    path: path.to_owned(),
                    source,
                },
            });
        }
    };
    if !metadata.is_dir() {
        return Err(ErrorKind::NotADirectory {
            path: path.to_owned(),
        });
    }
    let unreadable = |source| ErrorKind::DirectoryUnreadable {
        path: path.to_owned(),
        source,
    };
    let mut entries = tokio::fs::read_dir(path).await.map_err(unreadable)?;
    let mut names = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        names.push(entry.file_name());
    }
    Ok(names)
}

/// Eligible names from `present` that do not appear in `other`, sorted and without duplicates.
pub fn missing_names(present: &[OsString], other: &[OsString]) -> Vec<OsString> {
    let other: HashSet<&OsStr> = other.iter().map(OsString::as_os_str).collect();
    let mut missing: Vec<OsString> = present
        .iter()
        .filter(|name| match filter::check(name.as_os_str()) {
            filter::FilterResult::Included => !other.contains(name.as_os_str()),
            excluded => {
                event!(Level::DEBUG, "skipping {:?}: {:?}", name, excluded);
                false
            }
        })
        .cloned()
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

async fn report_missing<R: Reporter>(
    reporter: &R,
    dir: &Path,
    missing: &[OsString],
) -> anyhow::Result<()> {
    if missing.is_empty() {
        return reporter.report(&Event::NothingMissing { dir }).await;
    }
    reporter
        .report(&Event::Missing {
            dir,
            count: missing.len(),
        })
        .await?;
    for name in missing {
        reporter
            .report(&Event::MissingEntry {
                name: name.as_os_str(),
            })
            .await?;
    }
    Ok(())
}

/// Compare the entries directly under `src` and `dst` by name and optionally copy what is
/// missing on either side.
///
/// Both listings are reported before any copy starts. Copies run one at a time, first into the
/// source and then into the destination. The first failed copy aborts the whole run.
#[instrument(skip(reporter))]
pub async fn cmp<R: Reporter>(
    src: &Path,
    dst: &Path,
    reporter: &R,
    settings: &Settings,
) -> Result<Summary, Error> {
    event!(Level::DEBUG, "listing 'src' and 'dst' directories");
    let src_names = list_dir(src)
        .await
        .map_err(|kind| Error::new(kind, Default::default()))?;
    let dst_names = list_dir(dst)
        .await
        .map_err(|kind| Error::new(kind, Default::default()))?;
    let dirs: EnumMap<Side, &Path> = enum_map! {
        Side::Source => src,
        Side::Destination => dst,
    };
    let mut summary = Summary::default();
    summary.missing[Side::Source] = missing_names(&dst_names, &src_names);
    summary.missing[Side::Destination] = missing_names(&src_names, &dst_names);
    for side in [Side::Source, Side::Destination] {
        report_missing(reporter, dirs[side], &summary.missing[side])
            .await
            .map_err(|err| Error::new(ErrorKind::ReportFailed(err), summary.clone()))?;
    }
    for side in [Side::Source, Side::Destination] {
        if !settings.copies_into(side) || summary.missing[side].is_empty() {
            continue;
        }
        event!(Level::DEBUG, "copying missing files into {:?}", dirs[side]);
        let names = summary.missing[side].clone();
        for name in &names {
            let from = dirs[side.other()].join(name);
            let to = dirs[side].join(name);
            let name = name.as_os_str();
            reporter
                .report(&Event::CopyStarted { name })
                .await
                .map_err(|err| Error::new(ErrorKind::ReportFailed(err), summary.clone()))?;
            let copied = match copy::copy_file(&from, &to, &settings.preserve).await {
                Ok(copied) => copied,
                Err(source) => {
                    event!(
                        Level::ERROR,
                        "copy: {:?} -> {:?} failed with: {:#}",
                        &from,
                        &to,
                        &source
                    );
                    if let Err(err) = reporter.report(&Event::CopyFailed { name }).await {
                        event!(Level::WARN, "cannot report failed copy: {:#}", err);
                    }
                    return Err(Error::new(
                        ErrorKind::CopyFailed {
                            src: from,
                            dst: to,
                            source,
                        },
                        summary,
                    ));
                }
            };
            summary.files_copied[side] += 1;
            summary.bytes_copied[side] += copied.bytes;
            reporter
                .report(&Event::Copied { name, copied })
                .await
                .map_err(|err| Error::new(ErrorKind::ReportFailed(err), summary.clone()))?;
        }
    }
    Ok(summary)
}
