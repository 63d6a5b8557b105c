use crate::domain::model::Record;
use crate::domain::ports::RecordSink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub delimiter: u8,
    pub header: Option<String>,
    pub append: bool,
    pub delete_if_empty: bool,
    pub write_timeout: Option<Duration>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            header: None,
            append: false,
            delete_if_empty: false,
            write_timeout: None,
        }
    }
}

/// Writes `lastName,firstName` lines, one flush per chunk.
///
/// A chunk is formatted completely in memory before anything touches the file, then
/// written, flushed and synced. The sync is the commit point; when any step fails the
/// file is truncated back to the last committed length.
pub struct DelimitedFileSink {
    path: PathBuf,
    file: Option<File>,
    options: SinkOptions,
    committed_len: u64,
    records_written: u64,
    #[cfg(test)]
    fail_before_sync: bool,
}

impl DelimitedFileSink {
    pub async fn open(path: impl AsRef<Path>, options: SinkOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| EtlError::SinkUnavailable {
            path: path.clone(),
            source,
        };

        let mut open_options = OpenOptions::new();
        open_options.create(true);
        if options.append {
            open_options.append(true);
        } else {
            open_options.write(true).truncate(true);
        }

        let file = open_options.open(&path).await.map_err(unavailable)?;
        let committed_len = file.metadata().await.map_err(unavailable)?.len();

        tracing::debug!(
            "Opened output file: {} (append: {}, existing bytes: {})",
            path.display(),
            options.append,
            committed_len
        );

        let mut sink = Self {
            path,
            file: Some(file),
            options,
            committed_len,
            records_written: 0,
            #[cfg(test)]
            fail_before_sync: false,
        };

        // 追加模式下已有內容時不重複寫表頭
        if let Some(header) = sink.options.header.clone() {
            if sink.committed_len == 0 {
                let mut bytes = header.into_bytes();
                bytes.push(b'\n');
                sink.commit(&bytes).await?;
            }
        }

        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Bytes durably present in the file.
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    fn write_failure(&self, source: io::Error) -> EtlError {
        EtlError::WriteFailure {
            path: self.path.clone(),
            source,
        }
    }

    fn format_chunk(&self, chunk: &[Record]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::with_capacity(chunk.len() * 32));

        let delimiter = self.options.delimiter;
        for record in chunk {
            let fields = [record.last_name.as_str(), record.first_name.as_str()];
            // 輸出不加引號，欄位含分隔符或換行會改變欄位數
            if let Some(field) = fields
                .iter()
                .find(|field| field.bytes().any(|b| matches!(b, b'\n' | b'\r') || b == delimiter))
            {
                return Err(EtlError::UnwritableField {
                    value: field.to_string(),
                    delimiter: delimiter as char,
                });
            }
            writer.write_record(fields)?;
        }

        writer
            .into_inner()
            .map_err(|e| self.write_failure(e.into_error()))
    }

    async fn write_and_sync(&mut self, bytes: &[u8]) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink is closed"))?;
        file.write_all(bytes).await?;
        file.flush().await?;
        #[cfg(test)]
        if self.fail_before_sync {
            return Err(io::Error::other("sync refused"));
        }
        file.sync_data().await
    }

    async fn commit(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.options.write_timeout;
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.write_and_sync(bytes))
                .await
                .unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "chunk write timed out",
                    ))
                }),
            None => self.write_and_sync(bytes).await,
        };

        match result {
            Ok(()) => {
                self.committed_len += bytes.len() as u64;
                Ok(())
            }
            Err(source) => {
                self.rollback().await;
                Err(self.write_failure(source))
            }
        }
    }

    async fn rollback(&mut self) {
        let committed_len = self.committed_len;
        let append = self.options.append;
        let Some(file) = self.file.as_mut() else {
            return;
        };

        if let Err(e) = file.set_len(committed_len).await {
            tracing::warn!(
                "⚠️ Could not truncate {} back to {} bytes: {}",
                self.path.display(),
                committed_len,
                e
            );
            return;
        }
        if !append {
            if let Err(e) = file.seek(SeekFrom::Start(committed_len)).await {
                tracing::warn!("⚠️ Could not rewind {}: {}", self.path.display(), e);
            }
        }
        tracing::debug!(
            "Rolled back {} to {} bytes",
            self.path.display(),
            committed_len
        );
    }
}

#[async_trait]
impl RecordSink for DelimitedFileSink {
    async fn write_chunk(&mut self, chunk: &[Record]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        let bytes = self.format_chunk(chunk)?;
        self.commit(&bytes).await?;
        self.records_written += chunk.len() as u64;

        tracing::debug!(
            "Committed {} records ({} bytes) to {}",
            chunk.len(),
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().await.map_err(|e| self.write_failure(e))?;
        drop(file);

        if self.options.delete_if_empty && !self.options.append && self.records_written == 0 {
            tokio::fs::remove_file(&self.path).await?;
            tracing::info!("🗑️ No records written, removed {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_chunk_swaps_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let mut sink = DelimitedFileSink::open(&path, SinkOptions::default())
            .await
            .unwrap();

        sink.write_chunk(&[Record::new("JEAN", "DUPONT")])
            .await
            .unwrap();
        sink.write_chunk(&[Record::new("ALICE", "SMITH"), Record::new("BOB", "JONES")])
            .await
            .unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "DUPONT,JEAN\nSMITH,ALICE\nJONES,BOB\n");
        assert_eq!(sink.records_written(), 3);
        assert_eq!(sink.committed_len(), content.len() as u64);
    }

    #[tokio::test]
    async fn test_open_truncates_existing_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        std::fs::write(&path, "stale content\n").unwrap();

        let mut sink = DelimitedFileSink::open(&path, SinkOptions::default())
            .await
            .unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn test_header_is_committed_at_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let options = SinkOptions {
            header: Some("lastName,firstName".to_string()),
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "lastName,firstName\n"
        );
    }

    #[tokio::test]
    async fn test_append_keeps_existing_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        std::fs::write(&path, "LEE,CAROL\n").unwrap();

        let options = SinkOptions {
            append: true,
            header: Some("lastName,firstName".to_string()),
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();
        sink.write_chunk(&[Record::new("DAN", "KIM")]).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "LEE,CAROL\nKIM,DAN\n"
        );
    }

    #[tokio::test]
    async fn test_delete_if_empty_removes_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let options = SinkOptions {
            delete_if_empty: true,
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();
        sink.write_chunk(&[]).await.unwrap();
        sink.close().await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_custom_output_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.tsv");
        let options = SinkOptions {
            delimiter: b'\t',
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();
        sink.write_chunk(&[Record::new("JEAN", "DUPONT")])
            .await
            .unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "DUPONT\tJEAN\n");
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_sink_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("output.csv");
        let result = DelimitedFileSink::open(&path, SinkOptions::default()).await;
        assert!(matches!(result, Err(EtlError::SinkUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_field_containing_delimiter_is_rejected_before_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let mut sink = DelimitedFileSink::open(&path, SinkOptions::default())
            .await
            .unwrap();
        sink.write_chunk(&[Record::new("ALICE", "SMITH")])
            .await
            .unwrap();

        let result = sink
            .write_chunk(&[Record::new("BOB", "JONES"), Record::new("JOHN", "SMITH, JR")])
            .await;

        match result {
            Err(EtlError::UnwritableField { value, delimiter }) => {
                assert_eq!(value, "SMITH, JR");
                assert_eq!(delimiter, ',');
            }
            other => panic!("expected UnwritableField, got {:?}", other),
        }
        assert_eq!(sink.records_written(), 1);
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SMITH,ALICE\n");
    }

    #[tokio::test]
    async fn test_failed_commit_truncates_written_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let options = SinkOptions {
            header: Some("lastName,firstName".to_string()),
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();
        sink.write_chunk(&[Record::new("ALICE", "SMITH")])
            .await
            .unwrap();
        let committed = sink.committed_len();

        // 資料已寫入並 flush，sync 前失敗
        sink.fail_before_sync = true;
        let result = sink
            .write_chunk(&[Record::new("BOB", "JONES"), Record::new("CAROL", "LEE")])
            .await;

        assert!(matches!(result, Err(EtlError::WriteFailure { .. })));
        assert_eq!(sink.committed_len(), committed);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), committed);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "lastName,firstName\nSMITH,ALICE\n"
        );

        // 回滾後寫入位置回到提交點
        sink.fail_before_sync = false;
        sink.write_chunk(&[Record::new("DAN", "KIM")]).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "lastName,firstName\nSMITH,ALICE\nKIM,DAN\n"
        );
        assert_eq!(sink.records_written(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_in_append_mode_keeps_prior_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        std::fs::write(&path, "LEE,CAROL\n").unwrap();
        let options = SinkOptions {
            append: true,
            ..SinkOptions::default()
        };
        let mut sink = DelimitedFileSink::open(&path, options).await.unwrap();

        sink.fail_before_sync = true;
        let result = sink.write_chunk(&[Record::new("DAN", "KIM")]).await;
        assert!(matches!(result, Err(EtlError::WriteFailure { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "LEE,CAROL\n");

        sink.fail_before_sync = false;
        sink.write_chunk(&[Record::new("EVE", "PARK")]).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "LEE,CAROL\nPARK,EVE\n"
        );
    }

    #[tokio::test]
    async fn test_write_after_close_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        let mut sink = DelimitedFileSink::open(&path, SinkOptions::default())
            .await
            .unwrap();
        sink.close().await.unwrap();

        let result = sink.write_chunk(&[Record::new("A", "B")]).await;
        assert!(matches!(result, Err(EtlError::WriteFailure { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
