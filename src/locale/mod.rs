//! 词典来源与语言表
//!
//! 活动词典按 已加载→内置→默认语言 的优先级解析，解析从不失败：
//! 内置词典随二进制打包，任何语言最终都能得到某个词典。

pub mod cache;
pub mod fetch;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::dictionary::Dictionary;
use crate::settings::{LanguageCode, DEFAULT_LANGUAGE};

use cache::LocaleCache;

/// 解析内置词典 JSON；内置文件随源码打包，解析失败收敛为空词典
fn parse_bundled(code: LanguageCode, raw: &str) -> Dictionary {
    match serde_json::from_str(raw) {
        Ok(dictionary) => dictionary,
        Err(err) => {
            tracing::error!(language = %code, "内置词典解析失败: {}", err);
            Dictionary::new()
        }
    }
}

/// 内置词典表（惰性解析，进程内只做一次）
pub fn bundled_languages() -> &'static HashMap<LanguageCode, Dictionary> {
    static BUNDLED: OnceLock<HashMap<LanguageCode, Dictionary>> = OnceLock::new();
    BUNDLED.get_or_init(|| {
        let mut table = HashMap::new();
        table.insert(
            LanguageCode::Ja,
            parse_bundled(LanguageCode::Ja, include_str!("../locales/ja.json")),
        );
        table.insert(
            LanguageCode::ZhTw,
            parse_bundled(LanguageCode::ZhTw, include_str!("../locales/zh-TW.json")),
        );
        table.insert(
            LanguageCode::ZhCn,
            parse_bundled(LanguageCode::ZhCn, include_str!("../locales/zh-CN.json")),
        );
        table.insert(
            LanguageCode::Ko,
            parse_bundled(LanguageCode::Ko, include_str!("../locales/ko.json")),
        );
        table
    })
}

/// 已加载语言表：内置词典为底，缓存与远程更新覆盖其上
#[derive(Debug, Clone)]
pub struct LanguageTable {
    loaded: HashMap<LanguageCode, Dictionary>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        LanguageTable::new()
    }
}

impl LanguageTable {
    /// 以内置词典初始化
    pub fn new() -> Self {
        LanguageTable {
            loaded: bundled_languages().clone(),
        }
    }

    /// 解析语言对应的词典
    ///
    /// 已加载 → 内置 → 默认语言已加载 → 默认语言内置。
    /// 链条的末端总是存在，调用方永远能得到某个词典。
    pub fn resolve(&self, code: LanguageCode) -> &Dictionary {
        if let Some(dictionary) = self.loaded.get(&code) {
            return dictionary;
        }
        if let Some(dictionary) = bundled_languages().get(&code) {
            return dictionary;
        }
        if let Some(dictionary) = self.loaded.get(&DEFAULT_LANGUAGE) {
            return dictionary;
        }
        bundled_languages()
            .get(&DEFAULT_LANGUAGE)
            .expect("bundled table always contains the default language")
    }

    /// 用新词典覆盖某个语言（缓存预热或远程刷新）
    pub fn update(&mut self, code: LanguageCode, dictionary: Dictionary) {
        self.loaded.insert(code, dictionary);
    }

    /// 用缓存中仍新鲜的条目预热语言表（启动路径）
    pub fn prime_from_cache(&mut self, cache: &LocaleCache) {
        for &code in LanguageCode::ALL {
            if let Some(entry) = cache.fresh(code) {
                self.loaded.insert(code, entry.dictionary.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::{LocaleCacheEntry, LocaleSource};

    #[test]
    fn test_bundled_languages_are_complete() {
        let bundled = bundled_languages();
        for code in LanguageCode::ALL {
            let dictionary = bundled.get(code).expect("every language is bundled");
            assert!(
                !dictionary.is_empty(),
                "bundled dictionary for {} must not be empty",
                code
            );
        }
    }

    #[test]
    fn test_resolve_prefers_loaded_over_bundled() {
        let mut table = LanguageTable::new();
        let mut custom = Dictionary::new();
        custom.insert("Publish".to_string(), "発行".to_string());
        table.update(LanguageCode::Ja, custom);

        assert_eq!(
            table.resolve(LanguageCode::Ja).get("Publish").unwrap(),
            "発行"
        );
    }

    #[test]
    fn test_resolve_never_fails() {
        let table = LanguageTable::new();
        for code in LanguageCode::ALL {
            let _ = table.resolve(*code);
        }
    }

    #[test]
    fn test_prime_from_cache_skips_stale_entries() {
        let mut cache = LocaleCache::new();

        let mut fresh_dictionary = Dictionary::new();
        fresh_dictionary.insert("Publish".to_string(), "最新".to_string());
        cache.insert(
            LanguageCode::Ja,
            LocaleCacheEntry::new(fresh_dictionary, LocaleSource::Primary),
        );

        let mut stale_dictionary = Dictionary::new();
        stale_dictionary.insert("Publish".to_string(), "過期".to_string());
        let mut stale = LocaleCacheEntry::new(stale_dictionary, LocaleSource::Primary);
        stale.fetched_at =
            chrono::Utc::now() - chrono::Duration::hours(cache::LOCALE_CACHE_TTL_HOURS * 2);
        cache.insert(LanguageCode::Ko, stale);

        let mut table = LanguageTable::new();
        table.prime_from_cache(&cache);

        assert_eq!(
            table.resolve(LanguageCode::Ja).get("Publish").unwrap(),
            "最新"
        );
        assert_ne!(
            table.resolve(LanguageCode::Ko).get("Publish").map(String::as_str),
            Some("過期"),
            "stale cache entries must not prime the table"
        );
    }
}
