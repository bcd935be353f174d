use std::path::{Path, PathBuf};

use tokio::{fs, fs::File, io::AsyncWriteExt};
use tracing::debug;

/// Replaces the contents of a file in a single step. Data is written into a sibling
/// temporary file which is synced and then renamed over the target, so a reader can never
/// observe a torn or half-written file, even when the process dies mid-write.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
    let staging = staging_path(path);
    debug!("Writing {} bytes into {staging:?}", contents.len());

    let mut file = File::create(&staging).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&staging, path).await?;
    Ok(())
}

/// The temporary file has to live next to the target, otherwise the rename could cross a
/// filesystem boundary and stop being atomic.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::write_atomic;

    #[tokio::test]
    async fn test_write_atomic_creates_target() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");

        write_atomic(&path, b"[]").await?;

        assert_eq!(tokio::fs::read_to_string(&path).await?, "[]");
        Ok(())
    }

    #[tokio::test]
    async fn test_write_atomic_fully_replaces_longer_contents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");

        write_atomic(&path, b"0123456789").await?;
        write_atomic(&path, b"ab").await?;

        // No leftover tail from the longer first write.
        assert_eq!(tokio::fs::read_to_string(&path).await?, "ab");
        Ok(())
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_staging_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("records.json");

        write_atomic(&path, b"first").await?;
        write_atomic(&path, b"second").await?;

        let mut entries = tokio::fs::read_dir(dir.path()).await?;
        let mut names = vec![];
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec!["records.json"]);
        Ok(())
    }
}
