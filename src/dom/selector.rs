//! 排除选择器
//!
//! 外部配置提供的 CSS 选择器列表，用于把整棵子树排除在翻译之外。
//! 支持简单复合选择器：标签、`.class`、`#id`、`[attr]`、`[attr=value]`。
//! 列表在构建时编译一次，之后对每个元素 / 祖先链做 O(1) 级别的匹配。

use crate::dom::{get_node_attr, get_node_name, get_parent_node};
use crate::error::{LocalizeError, LocalizeResult};
use markup5ever_rcdom::Handle;

/// 简单选择器成分
#[derive(Debug, Clone, PartialEq, Eq)]
enum SimplePart {
    Tag(String),
    Class(String),
    Id(String),
    Attr { name: String, value: Option<String> },
}

/// 编译后的复合选择器：所有成分必须在同一元素上成立
#[derive(Debug, Clone)]
pub struct Selector {
    raw: String,
    parts: Vec<SimplePart>,
}

impl Selector {
    /// 解析单个复合选择器
    pub fn parse(raw: &str) -> LocalizeResult<Selector> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LocalizeError::Selector("空选择器".to_string()));
        }
        if trimmed.contains(char::is_whitespace) || trimmed.contains('>') {
            return Err(LocalizeError::Selector(format!(
                "不支持组合选择器: {}",
                trimmed
            )));
        }

        let mut parts = Vec::new();
        let mut rest = trimmed;

        while !rest.is_empty() {
            let (part, remainder) = Self::parse_part(rest)?;
            parts.push(part);
            rest = remainder;
        }

        Ok(Selector {
            raw: trimmed.to_string(),
            parts,
        })
    }

    fn parse_part(input: &str) -> LocalizeResult<(SimplePart, &str)> {
        let mut chars = input.char_indices();
        let (_, first) = chars.next().expect("input is non-empty");

        match first {
            '.' | '#' => {
                let body = &input[1..];
                let end = body
                    .find(|c| matches!(c, '.' | '#' | '['))
                    .unwrap_or(body.len());
                if end == 0 {
                    return Err(LocalizeError::Selector(format!("缺少名称: {}", input)));
                }
                let name = body[..end].to_string();
                let part = if first == '.' {
                    SimplePart::Class(name)
                } else {
                    SimplePart::Id(name)
                };
                Ok((part, &body[end..]))
            }
            '[' => {
                let body = &input[1..];
                let close = body.find(']').ok_or_else(|| {
                    LocalizeError::Selector(format!("属性选择器未闭合: {}", input))
                })?;
                let inner = &body[..close];
                let part = match inner.split_once('=') {
                    Some((name, value)) => SimplePart::Attr {
                        name: name.trim().to_string(),
                        value: Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                    },
                    None => SimplePart::Attr {
                        name: inner.trim().to_string(),
                        value: None,
                    },
                };
                Ok((part, &body[close + 1..]))
            }
            _ => {
                let end = input
                    .find(|c| matches!(c, '.' | '#' | '['))
                    .unwrap_or(input.len());
                Ok((
                    SimplePart::Tag(input[..end].to_ascii_lowercase()),
                    &input[end..],
                ))
            }
        }
    }

    /// 检查元素本身是否匹配本选择器
    pub fn matches(&self, node: &Handle) -> bool {
        let Some(tag) = get_node_name(node) else {
            return false;
        };

        self.parts.iter().all(|part| match part {
            SimplePart::Tag(expected) => tag.eq_ignore_ascii_case(expected),
            SimplePart::Class(expected) => get_node_attr(node, "class")
                .map(|classes| classes.split_whitespace().any(|c| c == expected))
                .unwrap_or(false),
            SimplePart::Id(expected) => get_node_attr(node, "id")
                .map(|id| id == *expected)
                .unwrap_or(false),
            SimplePart::Attr { name, value } => match get_node_attr(node, name) {
                Some(actual) => value.as_ref().map(|v| actual == *v).unwrap_or(true),
                None => false,
            },
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// 有序的排除选择器列表
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    selectors: Vec<Selector>,
}

impl ExclusionList {
    pub fn new(raw_selectors: &[String]) -> ExclusionList {
        let mut selectors = Vec::with_capacity(raw_selectors.len());
        for raw in raw_selectors {
            match Selector::parse(raw) {
                Ok(selector) => selectors.push(selector),
                Err(err) => tracing::warn!(selector = %raw, "排除选择器被忽略: {}", err),
            }
        }
        ExclusionList { selectors }
    }

    /// 从逗号连接的选择器串构建（外部配置的连接形式）
    pub fn from_joined(joined: &str) -> ExclusionList {
        let raw: Vec<String> = joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(&raw)
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// 元素本身是否命中任一选择器
    pub fn matches_element(&self, node: &Handle) -> bool {
        !self.selectors.is_empty() && self.selectors.iter().any(|s| s.matches(node))
    }

    /// 元素或其任一祖先是否命中（等价于 closest() 非空）
    pub fn matches_ancestry(&self, node: &Handle) -> bool {
        if self.selectors.is_empty() {
            return false;
        }

        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if self.matches_element(&candidate) {
                return true;
            }
            current = get_parent_node(&candidate);
        }
        false
    }
}
