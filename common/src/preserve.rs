use anyhow::{Context, Result};
use std::os::unix::fs::MetadataExt;
use std::os::unix::prelude::PermissionsExt;
use tracing::{event, instrument, Level};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// preserve access and modification times
    pub time: bool,
    /// permission bits copied from the source, 0 leaves the destination mode alone
    pub mode_mask: u32,
    pub uid: bool,
    pub gid: bool,
}

impl Settings {
    pub fn owner(&self) -> bool {
        self.uid || self.gid
    }
}

#[instrument]
async fn set_owner_and_time(
    settings: &Settings,
    path: &std::path::Path,
    metadata: &std::fs::Metadata,
) -> Result<()> {
    let settings = settings.to_owned();
    let dst = path.to_owned();
    let metadata = metadata.to_owned();
    tokio::task::spawn_blocking(move || -> Result<()> {
        // set timestamps first - those are unlikely to fail
        if settings.time {
            event!(Level::DEBUG, "setting timestamps");
            let atime = filetime::FileTime::from_last_access_time(&metadata);
            let mtime = filetime::FileTime::from_last_modification_time(&metadata);
            filetime::set_file_times(&dst, atime, mtime)
                .with_context(|| format!("failed setting timestamps for {:?}", &dst))?;
        }
        if settings.owner() {
            // set user and group last, if those fail we at least have the timestamps set
            event!(Level::DEBUG, "setting uid and gid");
            let uid = settings
                .uid
                .then(|| nix::unistd::Uid::from_raw(metadata.uid()));
            let gid = settings
                .gid
                .then(|| nix::unistd::Gid::from_raw(metadata.gid()));
            nix::unistd::chown(&dst, uid, gid).with_context(|| {
                format!(
                    "cannot set {:?} owner to {:?} and/or group id to {:?}",
                    &dst, &uid, &gid
                )
            })?;
        }
        Ok(())
    })
    .await?
}

/// Apply the source file's metadata to a freshly copied destination file.
///
/// Order: permissions, timestamps, ownership.
pub async fn set_file_metadata(
    settings: &Settings,
    metadata: &std::fs::Metadata,
    path: &std::path::Path,
) -> Result<()> {
    if settings.mode_mask != 0 {
        let permissions = if settings.mode_mask == 0o7777 {
            // special case for full preserve
            metadata.permissions()
        } else {
            std::fs::Permissions::from_mode(metadata.permissions().mode() & settings.mode_mask)
        };
        tokio::fs::set_permissions(path, permissions.clone())
            .await
            .with_context(|| format!("cannot set {:?} permissions to {:?}", &path, &permissions))?;
    }
    set_owner_and_time(settings, path, metadata).await
}

/// Timestamps and every permission bit, ownership left alone.
pub fn preserve_default() -> Settings {
    Settings {
        time: true,
        mode_mask: 0o7777,
        uid: false,
        gid: false,
    }
}

/// Like [`preserve_default`] and additionally uid and gid, which usually requires root.
pub fn preserve_all() -> Settings {
    Settings {
        uid: true,
        gid: true,
        ..preserve_default()
    }
}
