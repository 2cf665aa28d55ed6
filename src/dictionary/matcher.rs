//! 匹配与替换引擎
//!
//! 对单个文本串应用编译后的匹配器集合：精确匹配快速路径 +
//! 按序回退的正则替换。本模块是输入的纯函数，不接触 DOM、
//! 不持有隐藏状态，正反两个方向因此完全对称且可测试。

use std::collections::{HashMap, VecDeque};

use regex::{Captures, NoExpand, Regex};

use super::token::Segment;

/// 替换动作
#[derive(Debug)]
pub(crate) enum ReplaceAction {
    /// 传统部分匹配模式：全局无锚定字面替换
    Global(String),
    /// 令牌化模板替换（锚定模式，捕获值按 FIFO 回填目标占位符）
    Tokens(TokenTemplate),
}

/// 复杂替换条目：编译后的模式 + 替换动作 + 可选的廉价预筛标记
#[derive(Debug)]
pub struct Replacement {
    pub(crate) pattern: Regex,
    pub(crate) action: ReplaceAction,
    pub(crate) marker: Option<String>,
    /// 源词条字符长度，用于最长匹配优先排序
    pub(crate) source_chars: usize,
}

/// 令牌替换模板
#[derive(Debug)]
pub(crate) struct TokenTemplate {
    /// 捕获组对应的令牌名，按源词条中的出现顺序。
    /// 组 1 为前导空白，组 2..n+1 为令牌，组 n+2 为尾随空白。
    pub(crate) capture_names: Vec<String>,
    /// 目标词条的片段序列
    pub(crate) target: Vec<Segment>,
}

impl TokenTemplate {
    /// 用捕获结果渲染目标串，保留首尾空白
    ///
    /// 同名占位符的捕获值按出现顺序构成 FIFO 池；目标侧占位符
    /// 耗尽池中的值后保留字面形式并发出警告，从不失败。
    fn render(&self, caps: &Captures) -> String {
        let mut pools: HashMap<&str, VecDeque<&str>> = HashMap::new();
        for (index, name) in self.capture_names.iter().enumerate() {
            if let Some(capture) = caps.get(index + 2) {
                pools.entry(name).or_default().push_back(capture.as_str());
            }
        }

        let trailing_index = self.capture_names.len() + 2;
        let mut out = String::new();
        out.push_str(caps.get(1).map_or("", |m| m.as_str()));

        for segment in &self.target {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(name) => {
                    match pools.get_mut(name.as_str()).and_then(VecDeque::pop_front) {
                        Some(value) => out.push_str(value),
                        None => {
                            tracing::warn!(
                                token = %name,
                                "目标占位符没有对应的捕获值，保留字面形式"
                            );
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                }
            }
        }

        out.push_str(caps.get(trailing_index).map_or("", |m| m.as_str()));
        out
    }
}

/// 编译后的匹配器集合：精确查找表 + 有序复杂条目列表
#[derive(Debug, Default)]
pub struct CompiledMatcherSet {
    pub(crate) exact: HashMap<String, String>,
    pub(crate) complex: Vec<Replacement>,
}

/// 一次替换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub updated: String,
    pub changed: bool,
}

impl CompiledMatcherSet {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.complex.is_empty()
    }

    /// 对文本应用本匹配器集合
    ///
    /// 快速路径：归一化 + 去首尾空白后查精确表，命中时把替换文本
    /// 拼回原始的首尾空白之间（保留原样，而非归一化形式）。
    /// 回退路径：按序尝试复杂条目，标记不命中的条目 O(1) 跳过；
    /// 多个条目可以先后作用于同一文本，全部尝试完毕才返回。
    pub fn apply(&self, text: &str) -> Applied {
        let leading_len = text.len() - text.trim_start().len();
        let trailing_start = text.trim_end().len();
        let core = &text[leading_len..trailing_start.max(leading_len)];

        if !core.is_empty() {
            if let Some(replacement) = self.exact.get(&normalize_whitespace(core)) {
                let mut updated =
                    String::with_capacity(text.len() - core.len() + replacement.len());
                updated.push_str(&text[..leading_len]);
                updated.push_str(replacement);
                updated.push_str(&text[trailing_start..]);
                return Applied {
                    updated,
                    changed: true,
                };
            }
        }

        let mut updated = text.to_string();
        let mut changed = false;

        for entry in &self.complex {
            if let Some(marker) = &entry.marker {
                if !updated.contains(marker.as_str()) {
                    continue;
                }
            }

            match &entry.action {
                ReplaceAction::Global(replacement) => {
                    let next = entry
                        .pattern
                        .replace_all(&updated, NoExpand(replacement))
                        .into_owned();
                    if next != updated {
                        updated = next;
                        changed = true;
                    }
                }
                ReplaceAction::Tokens(template) => {
                    if let Some(caps) = entry.pattern.captures(&updated) {
                        let next = template.render(&caps);
                        if next != updated {
                            updated = next;
                            changed = true;
                        }
                    }
                }
            }
        }

        Applied { updated, changed }
    }
}

/// 将空白序列折叠为单个空格，不去除首尾
pub(crate) fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_whitespace = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

/// 折叠空白并去除首尾，用作精确查找的键形式
pub(crate) fn normalize_whitespace(value: &str) -> String {
    let collapsed = collapse_whitespace(value);
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_keeps_edges() {
        assert_eq!(collapse_whitespace("You have \n items"), "You have items");
        assert_eq!(collapse_whitespace(" a  b "), " a b ");
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_whitespace("  Publish\n site  "), "Publish site");
    }
}
