//! 字典编译器
//!
//! 将扁平的 源语言→目标语言 字符串映射编译为可复用的匹配器集合：
//! 精确查找表（O(1) 命中，静态 UI 标签的主路径）加上按源词条长度
//! 降序排列的复杂条目（令牌化 / 部分匹配正则）。每个 (字典, 方向,
//! 严格模式) 组合只编译一次，随后跨成千上万个 DOM 节点复用。
//!
//! 反向编译器是正向的镜像：交换源 / 目标角色，使"把译文还原为
//! 源语言"无需存储第二份字典。

pub mod matcher;
pub mod token;

use std::collections::HashMap;

use regex::Regex;

use crate::error::{LocalizeError, LocalizeResult};

pub use matcher::{Applied, CompiledMatcherSet, Replacement};
pub use token::{has_tokens, tokenize, Segment};

use matcher::{collapse_whitespace, normalize_whitespace, ReplaceAction, TokenTemplate};

/// 词典：源语言串到目标语言串的映射
pub type Dictionary = HashMap<String, String>;

/// 编译方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 源语言 → 目标语言
    Forward,
    /// 目标语言 → 源语言（用于还原）
    Reverse,
}

/// 传统部分匹配模式下预筛标记的长度（字符数）
const MARKER_CHARS: usize = 6;

/// 将 JSON 值解析为词典
///
/// 顶层必须是对象；值不是字符串的条目被跳过并告警（可恢复）。
pub fn parse_dictionary(value: serde_json::Value) -> LocalizeResult<Dictionary> {
    let serde_json::Value::Object(map) = value else {
        return Err(LocalizeError::MalformedDictionary(
            "顶层 JSON 不是对象".to_string(),
        ));
    };

    let mut dictionary = Dictionary::with_capacity(map.len());
    for (key, value) in map {
        match value {
            serde_json::Value::String(text) => {
                dictionary.insert(key, text);
            }
            other => {
                tracing::warn!(key = %key, "词条值不是字符串，已跳过: {}", other);
            }
        }
    }
    Ok(dictionary)
}

/// 将词典编译为匹配器集合
///
/// - 替换侧为空串的条目被排除（空翻译表示"显示原文"）；
/// - 含 `{token}` 占位符的词条编译为位置锚定的令牌模式；
/// - 无占位符且严格模式开启的词条进入精确查找表；
/// - 严格模式关闭时所有无占位符词条成为全局无锚定替换，
///   附带源词条前几个字符构成的预筛标记；
/// - 复杂条目按源词条长度降序，防止短词条破坏包含它的长词条。
pub fn compile(dictionary: &Dictionary, direction: Direction, strict: bool) -> CompiledMatcherSet {
    let mut set = CompiledMatcherSet::default();

    for (key, value) in dictionary {
        let (source, target) = match direction {
            Direction::Forward => (key.as_str(), value.as_str()),
            Direction::Reverse => (value.as_str(), key.as_str()),
        };

        if source.trim().is_empty() || target.trim().is_empty() {
            continue;
        }

        if has_tokens(source) {
            if let Some(entry) = compile_tokenized(source, target) {
                set.complex.push(entry);
            }
            continue;
        }

        if strict {
            set.exact
                .insert(normalize_whitespace(source), target.to_string());
        } else if let Some(entry) = compile_partial(source, target) {
            set.complex.push(entry);
        }
    }

    set.complex
        .sort_by(|a, b| b.source_chars.cmp(&a.source_chars));
    set
}

/// 编译令牌化词条：`^(前导空白)(字面与占位符捕获序列)(尾随空白)$`
///
/// 字面片段内部的空白归一化为 `\s+`，软换行的文本仍可匹配；
/// 每个占位符是要求至少一个字符的非贪婪捕获组。
fn compile_tokenized(source: &str, target: &str) -> Option<Replacement> {
    let segments = tokenize(source);
    let mut pattern = String::from(r"^(\s*)");
    let mut capture_names = Vec::new();
    let mut marker = None;

    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(text) => {
                pattern.push_str(&flexible_literal(text));
                if index == 0 {
                    // 预筛标记取首个不含空白的词，与弹性空白模式不冲突
                    marker = text.split_whitespace().next().map(str::to_string);
                }
            }
            Segment::Token(name) => {
                capture_names.push(name.clone());
                pattern.push_str("(.+?)");
            }
        }
    }
    pattern.push_str(r"(\s*)$");

    let pattern = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(source = %source, "令牌模式编译失败，跳过词条: {}", err);
            return None;
        }
    };

    Some(Replacement {
        pattern,
        action: ReplaceAction::Tokens(TokenTemplate {
            capture_names,
            target: tokenize(target),
        }),
        marker,
        source_chars: source.chars().count(),
    })
}

/// 编译传统部分匹配词条：全局字面替换 + 预筛标记
fn compile_partial(source: &str, target: &str) -> Option<Replacement> {
    let pattern = match Regex::new(&regex::escape(source)) {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!(source = %source, "模式编译失败，跳过词条: {}", err);
            return None;
        }
    };

    Some(Replacement {
        pattern,
        action: ReplaceAction::Global(target.to_string()),
        marker: Some(source.chars().take(MARKER_CHARS).collect()),
        source_chars: source.chars().count(),
    })
}

/// 把字面片段转换为空白弹性的正则片段
fn flexible_literal(text: &str) -> String {
    collapse_whitespace(text)
        .split(' ')
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join(r"\s+")
}
