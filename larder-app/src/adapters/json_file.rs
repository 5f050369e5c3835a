//! 原子 JSON 文件读写

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use larder_core::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

/// 临时文件序号，保证并发写入互不覆盖
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// 获取数据目录路径
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("larder")
}

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub(crate) struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub async fn read<T: DeserializeOwned>(&self) -> CoreResult<Option<T>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::StorageError(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            CoreError::SerializationError(format!("{}: {e}", self.path.display()))
        })
    }

    /// Writes pretty JSON to a temp file in the same directory, then renames
    /// it over the target.
    pub async fn write<T: Serialize + ?Sized>(&self, value: &T) -> CoreResult<()> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CoreError::StorageError(e.to_string()))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CoreError::StorageError(format!(
                "Failed to write {}: {e}",
                tmp.display()
            )));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CoreError::StorageError(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            )));
        }

        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .map_or_else(|| "data".into(), |n| n.to_string_lossy());
        self.path
            .with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("absent.json"));
        let value: Option<Vec<u32>> = file.read().await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn write_creates_parent_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested").join("data.json"));

        file.write(&vec![1, 2, 3]).await.unwrap();

        let value: Option<Vec<u32>> = file.read().await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("data.json")]);
    }

    #[tokio::test]
    async fn garbage_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: CoreResult<Option<Vec<u32>>> = JsonFile::new(path).read().await;
        assert!(matches!(result, Err(CoreError::SerializationError(_))));
    }
}
