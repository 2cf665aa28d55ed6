//! DOM 遍历与过滤
//!
//! 在子树中枚举可翻译的文本节点和带 placeholder 属性的表单元素。
//! 跳过策略：非内容标签、可编辑区域、命中排除选择器的子树、
//! 去除空白后为空的文本。`<title>` 和 placeholder 属性是主文本
//! 遍历之外独立跟踪的两个可翻译面。

use markup5ever_rcdom::{Handle, NodeData};

use super::selector::ExclusionList;
use super::{get_node_attr, get_node_name, get_parent_node, get_text_content};

/// 非内容标签：其下的文本节点从不翻译
pub const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "canvas", "input", "textarea", "select", "option",
    "button",
];

/// 携带可翻译 placeholder 属性的表单标签
const PLACEHOLDER_TAGS: &[&str] = &["input", "textarea"];

fn is_skip_tag(tag: &str) -> bool {
    SKIP_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
}

/// 元素是否处于可编辑区域
///
/// contenteditable 是继承属性：向上找到最近一个显式声明的祖先，
/// 值为 "false" 时明确不可编辑，其余值（含空串）视为可编辑。
pub fn is_editable(node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if let Some(value) = get_node_attr(&candidate, "contenteditable") {
            return !value.eq_ignore_ascii_case("false");
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 元素级跳过判定，同样用于决定新增子树是否完全不扫描
pub fn is_skippable_element(node: &Handle, exclusions: &ExclusionList) -> bool {
    match get_node_name(node) {
        Some(tag) if is_skip_tag(tag) => true,
        Some(_) => is_editable(node) || exclusions.matches_ancestry(node),
        None => true,
    }
}

/// 单个文本节点的跳过判定（用于逐节点的变更处理）
pub fn should_skip_text_node(node: &Handle, exclusions: &ExclusionList) -> bool {
    let Some(text) = get_text_content(node) else {
        return true;
    };
    if text.trim().is_empty() {
        return true;
    }

    match get_parent_node(node) {
        Some(parent) => is_skippable_element(&parent, exclusions),
        None => true,
    }
}

/// 枚举子树中所有可翻译的文本节点
///
/// 命中跳过策略的元素整棵子树被剪枝，排除选择器因此对祖先自然生效。
pub fn walk_text_nodes(root: &Handle, exclusions: &ExclusionList) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_text_nodes(root, exclusions, &mut found);
    found
}

fn collect_text_nodes(node: &Handle, exclusions: &ExclusionList, found: &mut Vec<Handle>) {
    match node.data {
        NodeData::Text { ref contents } => {
            if !contents.borrow().trim().is_empty() {
                found.push(node.clone());
            }
        }
        NodeData::Element { ref name, .. } => {
            let tag = name.local.as_ref();
            if is_skip_tag(tag) || is_editable(node) || exclusions.matches_element(node) {
                return;
            }
            for child in node.children.borrow().iter() {
                collect_text_nodes(child, exclusions, found);
            }
        }
        _ => {
            for child in node.children.borrow().iter() {
                collect_text_nodes(child, exclusions, found);
            }
        }
    }
}

/// 枚举子树中带 placeholder 属性的 input/textarea 元素
///
/// placeholder 是独立可翻译面：input/textarea 虽在非内容标签集中，
/// 它们的 placeholder 属性仍参与翻译，只有排除选择器能剪枝。
pub fn walk_placeholder_elements(root: &Handle, exclusions: &ExclusionList) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_placeholder_elements(root, exclusions, &mut found);
    found
}

fn collect_placeholder_elements(node: &Handle, exclusions: &ExclusionList, found: &mut Vec<Handle>) {
    if let NodeData::Element { ref name, .. } = node.data {
        if exclusions.matches_element(node) {
            return;
        }

        let tag = name.local.as_ref();
        if PLACEHOLDER_TAGS.iter().any(|t| tag.eq_ignore_ascii_case(t))
            && get_node_attr(node, "placeholder").is_some()
        {
            found.push(node.clone());
        }
    }

    for child in node.children.borrow().iter() {
        collect_placeholder_elements(child, exclusions, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{get_child_node_by_name, get_html_element, html_to_dom};
    use markup5ever_rcdom::RcDom;

    fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8".to_string())
    }

    fn body(dom: &RcDom) -> Handle {
        let html = get_html_element(dom).unwrap();
        get_child_node_by_name(&html, "body").unwrap()
    }

    fn texts_of(nodes: &[Handle]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(get_text_content)
            .map(|t| t.trim().to_string())
            .collect()
    }

    #[test]
    fn test_walk_collects_content_text() {
        let dom = parse(
            "<html><body><p>Publish</p><div><span>Save draft</span></div></body></html>",
        );
        let nodes = walk_text_nodes(&body(&dom), &ExclusionList::default());
        assert_eq!(texts_of(&nodes), vec!["Publish", "Save draft"]);
    }

    #[test]
    fn test_walk_skips_non_content_tags() {
        let dom = parse(
            "<html><body><p>Keep</p><script>var x = 'skip';</script>\
             <button>skip too</button></body></html>",
        );
        let nodes = walk_text_nodes(&body(&dom), &ExclusionList::default());
        assert_eq!(texts_of(&nodes), vec!["Keep"]);
    }

    #[test]
    fn test_walk_skips_editable_regions() {
        let dom = parse(
            "<html><body><div contenteditable=\"\"><p>editing</p></div>\
             <div contenteditable=\"false\"><p>normal</p></div></body></html>",
        );
        let nodes = walk_text_nodes(&body(&dom), &ExclusionList::default());
        assert_eq!(texts_of(&nodes), vec!["normal"]);
    }

    #[test]
    fn test_walk_skips_excluded_subtrees() {
        let dom = parse(
            "<html><body><div class=\"no-translate\"><p>hidden</p></div>\
             <p>visible</p></body></html>",
        );
        let exclusions = ExclusionList::from_joined(".no-translate");
        let nodes = walk_text_nodes(&body(&dom), &exclusions);
        assert_eq!(texts_of(&nodes), vec!["visible"]);
    }

    #[test]
    fn test_walk_skips_whitespace_only_text() {
        let dom = parse("<html><body><p>   </p><p>real</p></body></html>");
        let nodes = walk_text_nodes(&body(&dom), &ExclusionList::default());
        assert_eq!(texts_of(&nodes), vec!["real"]);
    }

    #[test]
    fn test_placeholder_elements() {
        let dom = parse(
            "<html><body><input placeholder=\"Search\"><input type=\"text\">\
             <textarea placeholder=\"Notes\"></textarea></body></html>",
        );
        let elements = walk_placeholder_elements(&body(&dom), &ExclusionList::default());
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_should_skip_text_node_checks_ancestry() {
        let dom = parse(
            "<html><body><div class=\"no-translate\"><p>hidden</p></div></body></html>",
        );
        let div = get_child_node_by_name(&body(&dom), "div").unwrap();
        let p = get_child_node_by_name(&div, "p").unwrap();
        let text = p.children.borrow()[0].clone();

        let exclusions = ExclusionList::from_joined(".no-translate");
        assert!(should_skip_text_node(&text, &exclusions));
        assert!(!should_skip_text_node(&text, &ExclusionList::default()));
    }
}
