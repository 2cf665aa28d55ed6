//! 远程词典获取
//!
//! 每种语言配有主 / 备两个端点，按序尝试；非 2xx 或非对象 JSON
//! 是可恢复失败（记录日志并落入下一来源，最终落入缓存）。多语言
//! 刷新并发扇出，单个语言的失败不阻塞、不影响其他语言。

use std::time::Duration;

use reqwest::blocking::Client;

use crate::dictionary::{parse_dictionary, Dictionary};
use crate::error::{LocalizeError, LocalizeResult};
use crate::locale::cache::{LocaleCache, LocaleCacheEntry, LocaleSource};
use crate::settings::LanguageCode;

/// 请求超时
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// 词典发布仓库（主端点走 CDN，备端点直连仓库）
const PRIMARY_BASE: &str = "https://cdn.jsdelivr.net/gh/linguify/locales@latest/src/locales";
const SECONDARY_BASE: &str = "https://raw.githubusercontent.com/linguify/locales/main/src/locales";

/// 一种语言的主 / 备端点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleEndpoints {
    pub primary: String,
    pub secondary: String,
}

/// 语言对应的远程端点
pub fn endpoints_for(code: LanguageCode) -> LocaleEndpoints {
    LocaleEndpoints {
        primary: format!("{}/{}.json", PRIMARY_BASE, code.as_str()),
        secondary: format!("{}/{}.json", SECONDARY_BASE, code.as_str()),
    }
}

/// 构建带超时的 HTTP 客户端
pub fn build_client() -> LocalizeResult<Client> {
    Ok(Client::builder().timeout(FETCH_TIMEOUT).build()?)
}

/// 从单个端点获取词典
pub fn fetch_dictionary(client: &Client, endpoint: &str) -> LocalizeResult<Dictionary> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|err| LocalizeError::Fetch(format!("端点无效 {}: {}", endpoint, err)))?;

    let response = client.get(parsed).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(LocalizeError::Fetch(format!(
            "{} 返回 {}",
            endpoint, status
        )));
    }

    let body = response.text()?;
    let value: serde_json::Value = serde_json::from_str(&body)?;
    parse_dictionary(value)
}

/// 按主→备→缓存的顺序为一种语言取词典
///
/// `use_cdn` 关闭时跳过 CDN 主端点，直连仓库端点。两个端点都
/// 失败时落到缓存条目（包括已过期的），缓存也为空时返回 None——
/// 调用方保留先前的词典，静默无操作。
pub fn fetch_with_fallback(
    client: &Client,
    code: LanguageCode,
    cache: &LocaleCache,
    use_cdn: bool,
) -> Option<(Dictionary, LocaleSource)> {
    let endpoints = endpoints_for(code);

    if use_cdn {
        match fetch_dictionary(client, &endpoints.primary) {
            Ok(dictionary) => return Some((dictionary, LocaleSource::Primary)),
            Err(err) => {
                tracing::warn!(language = %code, "主端点获取失败: {}", err);
            }
        }
    }

    match fetch_dictionary(client, &endpoints.secondary) {
        Ok(dictionary) => return Some((dictionary, LocaleSource::Secondary)),
        Err(err) => {
            tracing::warn!(language = %code, "备端点获取失败: {}", err);
        }
    }

    cache.any(code).map(|entry| {
        tracing::warn!(language = %code, "两个端点均不可用，使用缓存词典");
        (entry.dictionary.clone(), entry.source)
    })
}

/// 并发刷新多种语言的词典
///
/// 每种语言独立走完自己的回退链；返回成功更新的语言集合并把
/// 新条目写入缓存。TTL 内已有新鲜缓存的语言直接取缓存，不发请求。
pub fn refresh_languages(
    codes: &[LanguageCode],
    cache: &mut LocaleCache,
    use_cdn: bool,
) -> Vec<(LanguageCode, Dictionary)> {
    let client = match build_client() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!("HTTP 客户端构建失败，跳过词典刷新: {}", err);
            return Vec::new();
        }
    };

    let mut updates = Vec::new();
    let mut to_fetch = Vec::new();

    for &code in codes {
        if let Some(entry) = cache.fresh(code) {
            updates.push((code, entry.dictionary.clone()));
        } else {
            to_fetch.push(code);
        }
    }

    let snapshot = cache.clone();
    let fetched: Vec<(LanguageCode, Option<(Dictionary, LocaleSource)>)> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = to_fetch
                .iter()
                .map(|&code| {
                    let client = &client;
                    let snapshot = &snapshot;
                    scope.spawn(move || {
                        (code, fetch_with_fallback(client, code, snapshot, use_cdn))
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!("词典获取线程异常退出");
                        (LanguageCode::Ja, None)
                    }
                })
                .collect()
        });

    for (code, result) in fetched {
        if let Some((dictionary, source)) = result {
            cache.insert(code, LocaleCacheEntry::new(dictionary.clone(), source));
            updates.push((code, dictionary));
        }
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_embed_language_code() {
        let endpoints = endpoints_for(LanguageCode::ZhTw);
        assert!(endpoints.primary.ends_with("/zh-TW.json"));
        assert!(endpoints.secondary.ends_with("/zh-TW.json"));
        assert_ne!(endpoints.primary, endpoints.secondary);
    }

    #[test]
    fn test_fallback_reaches_stale_cache() {
        // 无效端点让两级获取都失败，验证缓存降级
        let client = build_client().unwrap();
        let mut cache = LocaleCache::new();

        let mut dictionary = Dictionary::new();
        dictionary.insert("Publish".to_string(), "公開".to_string());
        let mut entry = LocaleCacheEntry::new(dictionary, LocaleSource::Primary);
        entry.fetched_at = chrono::Utc::now() - chrono::Duration::days(30);
        cache.insert(LanguageCode::Ja, entry);

        let err = fetch_dictionary(&client, "not a url");
        assert!(matches!(err, Err(LocalizeError::Fetch(_))));
        assert!(
            cache.any(LanguageCode::Ja).is_some(),
            "stale entry remains available as the final fallback"
        );
    }
}
