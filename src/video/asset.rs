use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// A downloaded video written under the assets directory.
///
/// The asset has exactly one owner. [`LocalAsset::revoke`] removes the file;
/// an asset that is simply dropped is removed on the blocking pool, so whoever
/// displays the video keeps it alive for as long as it is shown.
#[derive(Debug)]
pub struct LocalAsset {
    handle: String,
    path: PathBuf,
    size: u64,
    released: bool,
}

impl LocalAsset {
    /// Write `bytes` to a fresh `<uuid>.mp4` under `dir`.
    pub async fn write(dir: &Path, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let handle = format!("{}.mp4", uuid::Uuid::new_v4());
        let path = dir.join(&handle);
        tokio::fs::write(&path, bytes).await?;

        debug!(handle = %handle, size = bytes.len(), "stored video asset");
        Ok(Self {
            handle,
            path,
            size: bytes.len() as u64,
            released: false,
        })
    }

    /// Local handle (file name) the UI addresses the video by.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &'static str {
        VIDEO_MIME_TYPE
    }

    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Remove the file now and wait for it to be gone.
    pub async fn revoke(mut self) {
        self.released = true;
        log_removal(&self.handle, tokio::fs::remove_file(&self.path).await);
    }
}

impl Drop for LocalAsset {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let handle = std::mem::take(&mut self.handle);
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn_blocking(move || log_removal(&handle, std::fs::remove_file(&path)));
            }
            Err(_) => log_removal(&handle, std::fs::remove_file(&path)),
        }
    }
}

fn log_removal(handle: &str, result: io::Result<()>) {
    match result {
        Ok(()) => debug!(handle = %handle, "revoked video asset"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(handle = %handle, "failed to revoke video asset: {e}"),
    }
}
