//! 占位符令牌化
//!
//! 将包含 `{name}` 占位符的词条拆分为类型化的片段序列，
//! 供模式编译器和替换模板使用。不支持嵌套 / 重叠占位符。

/// 词条片段：字面文本或命名占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Token(String),
}

/// 将词条拆分为片段序列
///
/// 占位符语法为 `{name}`，name 为一个以上非 `}` 字符，两侧空白被去除。
/// 空大括号 `{}` 和未闭合的 `{` 保留为字面文本。
pub fn tokenize(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            Some(close) if close > 0 => {
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Token(after_open[..close].trim().to_string()));
                rest = &after_open[close + 1..];
            }
            Some(close) => {
                // "{}" 保留为字面文本
                literal.push_str(&rest[..open + 1 + close + 1]);
                rest = &after_open[close + 1..];
            }
            None => {
                literal.push_str(&rest[..]);
                rest = "";
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

/// 检查词条是否包含占位符
pub fn has_tokens(source: &str) -> bool {
    tokenize(source)
        .iter()
        .any(|segment| matches!(segment, Segment::Token(_)))
}
