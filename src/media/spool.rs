use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// A client upload buffered to a named temp file. The file is removed
/// when this value is dropped, whether or not the upload succeeded.
#[derive(Debug)]
pub struct SpooledUpload {
    file: NamedTempFile,
    writer: tokio::fs::File,
    file_name: String,
    content_type: Option<String>,
    len: u64,
}

impl SpooledUpload {
    /// Create an empty temp file carrying the original file's extension.
    pub fn create(file_name: &str, content_type: Option<String>) -> io::Result<Self> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix("snapfeed-upload-")
            .suffix(&suffix)
            .tempfile()?;
        let writer = tokio::fs::File::from_std(file.reopen()?);

        Ok(Self {
            file,
            writer,
            file_name: file_name.to_string(),
            content_type,
            len: 0,
        })
    }

    /// Append a chunk of the client's body to the temp file.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.writer.write_all(chunk).await?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Flush buffered chunks so the file at `path()` is complete.
    pub async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_extension_and_contents() {
        let mut spooled = SpooledUpload::create("beach.JPG", Some("image/jpeg".into())).unwrap();
        spooled.write_chunk(b"hello ").await.unwrap();
        spooled.write_chunk(b"world").await.unwrap();
        spooled.finish().await.unwrap();

        assert!(spooled.path().to_string_lossy().ends_with(".JPG"));
        assert_eq!(spooled.len(), 11);
        assert_eq!(spooled.file_name(), "beach.JPG");
        assert_eq!(spooled.content_type(), Some("image/jpeg"));
        assert_eq!(tokio::fs::read(spooled.path()).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn file_without_extension_gets_no_suffix() {
        let spooled = SpooledUpload::create("README", None).unwrap();
        assert!(spooled.is_empty());
        assert!(spooled.path().extension().is_none());
    }

    #[tokio::test]
    async fn many_chunks_through_one_handle() {
        let mut spooled = SpooledUpload::create("big.bin", None).unwrap();
        let chunk = vec![7u8; 8 * 1024];
        for _ in 0..64 {
            spooled.write_chunk(&chunk).await.unwrap();
        }
        spooled.finish().await.unwrap();

        assert_eq!(spooled.len(), 64 * 8 * 1024);
        let on_disk = tokio::fs::metadata(spooled.path()).await.unwrap().len();
        assert_eq!(on_disk, spooled.len());
    }

    #[tokio::test]
    async fn temp_file_removed_on_drop() {
        let spooled = SpooledUpload::create("clip.mp4", None).unwrap();
        let path = spooled.path().to_path_buf();
        assert!(path.exists());
        drop(spooled);
        assert!(!path.exists());
    }
}
