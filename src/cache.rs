// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{
    fs::Metadata,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::SystemTime,
};

use bytes::Bytes;
use lru::LruCache;

/// 文件在被缓存时的指纹。修改时间或大小任一变化，缓存即失效；
/// 大小必须一致，否则写出的正文会与已经计算好的 `Content-Length` 不符。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    pub fn new(modified: Option<SystemTime>, len: u64) -> Self {
        Self { modified, len }
    }

    pub fn of(metadata: &Metadata) -> Self {
        Self::new(metadata.modified().ok(), metadata.len())
    }

    pub fn size(&self) -> u64 {
        self.len
    }
}

#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    stamp: FileStamp,
}

/// 静态文件正文的 LRU 缓存，只服务于 I/O 层写出文件正文
pub struct FileCache {
    cache: LruCache<PathBuf, CacheEntry>,
}

impl FileCache {
    // 容量为0时按1处理，配置加载阶段已经把0改写为默认值
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    // 放入
    pub fn push(&mut self, path: &Path, bytes: Bytes, stamp: FileStamp) {
        self.cache.put(path.to_path_buf(), CacheEntry { content: bytes, stamp });
    }

    // 检查文件大小是否适合缓存
    pub fn should_cache(file_size: u64, threshold: u64) -> bool {
        file_size <= threshold
    }

    // 查询有效缓存，指纹不一致时剔除旧条目
    pub fn find(&mut self, path: &Path, stamp: FileStamp) -> Option<Bytes> {
        let stale = match self.cache.get(path) {
            Some(entry) if entry.stamp == stamp => return Some(entry.content.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.cache.pop(path);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
