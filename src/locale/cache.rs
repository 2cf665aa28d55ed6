//! 词典缓存
//!
//! 按语言码缓存 `{ 词典, 获取时间, 来源 }`，固定 TTL，避免冗余的
//! 网络请求，并支持"过期但可用"的降级。整个缓存以单一固定键
//! 存入外部键值 blob 存储（[`LocaleCacheStore`]），启动时读出以
//! 预热内存词典表，每次成功或降级获取后写回。

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{LocalizeError, LocalizeResult};
use crate::settings::LanguageCode;

/// 缓存 blob 的固定存储键
pub const LOCALE_CACHE_KEY: &str = "linguify.locales.v1";

/// 缓存条目的固定存活时间（小时）
pub const LOCALE_CACHE_TTL_HOURS: i64 = 6;

/// 词典来源端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSource {
    Primary,
    Secondary,
}

/// 单个语言的缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleCacheEntry {
    pub dictionary: Dictionary,
    pub fetched_at: DateTime<Utc>,
    pub source: LocaleSource,
}

impl LocaleCacheEntry {
    pub fn new(dictionary: Dictionary, source: LocaleSource) -> Self {
        LocaleCacheEntry {
            dictionary,
            fetched_at: Utc::now(),
            source,
        }
    }

    /// 条目是否仍在 TTL 内
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < Duration::hours(LOCALE_CACHE_TTL_HOURS)
    }
}

/// 外部键值 blob 存储接口
pub trait LocaleCacheStore {
    fn read_blob(&self, key: &str) -> LocalizeResult<Option<String>>;
    fn write_blob(&mut self, key: &str, blob: &str) -> LocalizeResult<()>;
}

/// 内存 blob 存储（测试和嵌入场景）
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    blobs: HashMap<String, String>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocaleCacheStore for MemoryCacheStore {
    fn read_blob(&self, key: &str) -> LocalizeResult<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write_blob(&mut self, key: &str, blob: &str) -> LocalizeResult<()> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// 内存中的词典缓存
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LocaleCache {
    entries: HashMap<LanguageCode, LocaleCacheEntry>,
}

impl LocaleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从外部存储载入缓存；读取或解析失败回退到空缓存并告警
    pub fn load(store: &dyn LocaleCacheStore) -> LocaleCache {
        let blob = match store.read_blob(LOCALE_CACHE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return LocaleCache::new(),
            Err(err) => {
                tracing::warn!("词典缓存读取失败: {}", err);
                return LocaleCache::new();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!("词典缓存内容无法解析，已忽略: {}", err);
                LocaleCache::new()
            }
        }
    }

    /// 把缓存写回外部存储
    pub fn save(&self, store: &mut dyn LocaleCacheStore) -> LocalizeResult<()> {
        let blob = serde_json::to_string(self)?;
        store
            .write_blob(LOCALE_CACHE_KEY, &blob)
            .map_err(|err| LocalizeError::Storage(err.to_string()))
    }

    pub fn insert(&mut self, code: LanguageCode, entry: LocaleCacheEntry) {
        self.entries.insert(code, entry);
    }

    /// 取 TTL 内的新鲜条目
    pub fn fresh(&self, code: LanguageCode) -> Option<&LocaleCacheEntry> {
        self.entries
            .get(&code)
            .filter(|entry| entry.is_fresh(Utc::now()))
    }

    /// 取任意条目，包括已过期的（过期但可用的降级路径）
    pub fn any(&self, code: LanguageCode) -> Option<&LocaleCacheEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
