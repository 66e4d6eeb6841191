//! 本地文件 Sink
//!
//! 每条记录序列化为格式化 JSON，追加到文件末尾并以空行分隔

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{AnswerRecord, RelaySink};
use crate::config::SinkKind;

pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    ///
    /// 整个块通过一次写入完成，不加锁；并发写入之间不保证顺序
    pub async fn append(&self, record: &AnswerRecord) -> Result<()> {
        let mut block = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
        block.push_str("\n\n");

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.write_all(block.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl RelaySink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    async fn relay(&self, record: &AnswerRecord) -> Result<Option<Value>> {
        self.append(record).await?;
        tracing::info!(path = %self.path().display(), "Response saved");
        Ok(None)
    }
}
