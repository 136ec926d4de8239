use std::path::Path;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use super::errors::Result;

/// 默认分片大小 5 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// 分片信息，字节范围为 `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub uploaded: bool,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 从文件读取该分片的数据
    pub async fn read_from(&self, path: &Path) -> Result<Bytes> {
        let mut file = File::open(path).await?;
        file.seek(std::io::SeekFrom::Start(self.start)).await?;

        let mut buffer = vec![0u8; self.len() as usize];
        file.read_exact(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }
}

/// 计算分片，`chunk_size` 为 0 时返回空列表
pub fn partition(file_size: u64, chunk_size: u64) -> Vec<Chunk> {
    if chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(file_size.div_ceil(chunk_size) as usize);
    let mut start = 0;
    let mut index = 0;

    while start < file_size {
        let end = std::cmp::min(start + chunk_size, file_size);
        chunks.push(Chunk {
            index,
            start,
            end,
            uploaded: false,
        });
        start = end;
        index += 1;
    }

    chunks
}
