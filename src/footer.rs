//! 页脚注入
//!
//! 在页面底部注入一个标注当前翻译状态的页脚元素，并随设置变更
//! 同步更新。容器可能晚于引擎就绪（渐进渲染的页面），因此注入
//! 带有限次数的重试与固定退避；重试次数耗尽后静默放弃，页脚
//! 是增强功能，不是翻译正确性的一部分。

use std::time::{Duration, Instant};

use markup5ever_rcdom::{Handle, RcDom};

use crate::dom::selector::Selector;
use crate::dom::{
    append_child, create_element_node, create_text_node, get_node_attr, set_node_attr,
    set_text_content,
};
use crate::settings::{LanguageCode, LanguageSelection, SettingsPatch};

/// 注入页脚的元素 id
pub const FOOTER_ID: &str = "linguify-footer";

/// 容器缺失时的最大重试次数
const MAX_ATTEMPTS: u32 = 10;

/// 两次重试之间的固定退避
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// 页脚接收方
///
/// 引擎在每次设置应用和每次刷新后无条件通知，由实现方决定
/// 注入、更新还是忽略。
pub trait FooterSink {
    fn notify(&mut self, dom: &RcDom, language: LanguageCode, enabled: bool);

    /// 完整的设置应用开始时调用，给实现方重置内部状态的机会
    fn reset(&mut self) {}
}

/// 页脚状态文案；禁用时固定英文
fn footer_message(language: LanguageCode, enabled: bool) -> &'static str {
    if !enabled {
        return "Translation is off";
    }
    match language {
        LanguageCode::Ja => "このページは日本語で表示されています",
        LanguageCode::ZhTw => "本頁面以繁體中文顯示",
        LanguageCode::ZhCn => "本页面以简体中文显示",
        LanguageCode::Ko => "이 페이지는 한국어로 표시됩니다",
    }
}

/// 由用户的语言选择生成设置更新
///
/// 选择 "off" 只改语言字段：启用开关独立保留，便于用户切回
/// 先前语言时不用重新开启翻译。
pub fn language_choice_patch(selection: LanguageSelection) -> SettingsPatch {
    SettingsPatch {
        language: Some(selection),
        ..Default::default()
    }
}

/// 深度优先找第一个命中选择器的元素
fn find_element(node: &Handle, selector: &Selector) -> Option<Handle> {
    if selector.matches(node) {
        return Some(node.clone());
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_element(child, selector) {
            return Some(found);
        }
    }
    None
}

/// 基于 DOM 的页脚注入器
#[derive(Debug)]
pub struct DomFooter {
    container: Selector,
    attempts_left: u32,
    next_attempt_at: Option<Instant>,
}

impl Default for DomFooter {
    fn default() -> Self {
        DomFooter::new(Selector::parse("body").expect("tag selector always parses"))
    }
}

impl DomFooter {
    pub fn new(container: Selector) -> Self {
        DomFooter {
            container,
            attempts_left: MAX_ATTEMPTS,
            next_attempt_at: None,
        }
    }

    /// 是否还在等待下一次重试机会
    pub fn retry_pending(&self) -> bool {
        self.attempts_left > 0 && self.next_attempt_at.is_some()
    }

    /// 在容器下找到或创建页脚元素
    fn ensure_footer(&mut self, dom: &RcDom) -> Option<Handle> {
        let container = match find_element(&dom.document, &self.container) {
            Some(container) => {
                self.next_attempt_at = None;
                container
            }
            None => {
                if self.attempts_left == 0 {
                    return None;
                }
                self.attempts_left -= 1;
                self.next_attempt_at = Some(Instant::now() + RETRY_DELAY);
                tracing::debug!(
                    container = %self.container.raw(),
                    remaining = self.attempts_left,
                    "页脚容器尚未就绪，稍后重试"
                );
                return None;
            }
        };

        for child in container.children.borrow().iter() {
            if get_node_attr(child, "id").as_deref() == Some(FOOTER_ID) {
                return Some(child.clone());
            }
        }

        let footer = create_element_node("div", vec![("id", FOOTER_ID)]);
        append_child(&footer, &create_text_node(""));
        append_child(&container, &footer);
        Some(footer)
    }
}

impl FooterSink for DomFooter {
    /// 重置重试预算（每次完整的设置应用都算新的注入机会）
    fn reset(&mut self) {
        self.attempts_left = MAX_ATTEMPTS;
        self.next_attempt_at = None;
    }

    fn notify(&mut self, dom: &RcDom, language: LanguageCode, enabled: bool) {
        let Some(footer) = self.ensure_footer(dom) else {
            return;
        };

        set_node_attr(&footer, "data-lang", Some(language.as_str().to_string()));
        set_node_attr(&footer, "data-enabled", Some(enabled.to_string()));

        let message = footer_message(language, enabled);
        let text = footer.children.borrow().first().cloned();
        if let Some(text) = text {
            set_text_content(&text, message);
        }

    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{get_text_content, html_to_dom};

    fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8".to_string())
    }

    fn footer_of(dom: &RcDom) -> Option<Handle> {
        let id_selector = Selector::parse(&format!("#{}", FOOTER_ID)).unwrap();
        find_element(&dom.document, &id_selector)
    }

    #[test]
    fn test_footer_injected_once_and_updated() {
        let dom = parse("<html><body><p>content</p></body></html>");
        let mut sink = DomFooter::default();

        sink.notify(&dom, LanguageCode::Ja, true);
        let footer = footer_of(&dom).expect("footer should be injected");
        assert_eq!(get_node_attr(&footer, "data-lang").as_deref(), Some("ja"));
        assert_eq!(
            get_node_attr(&footer, "data-enabled").as_deref(),
            Some("true")
        );

        sink.notify(&dom, LanguageCode::Ko, true);
        let again = footer_of(&dom).expect("footer persists");
        assert!(std::rc::Rc::ptr_eq(&footer, &again), "no duplicate footer");
        assert_eq!(get_node_attr(&again, "data-lang").as_deref(), Some("ko"));
    }

    #[test]
    fn test_footer_message_localization() {
        let dom = parse("<html><body></body></html>");
        let mut sink = DomFooter::default();

        sink.notify(&dom, LanguageCode::ZhCn, true);
        let footer = footer_of(&dom).unwrap();
        let text = footer.children.borrow()[0].clone();
        assert_eq!(
            get_text_content(&text).as_deref(),
            Some("本页面以简体中文显示")
        );

        sink.notify(&dom, LanguageCode::ZhCn, false);
        assert_eq!(
            get_text_content(&text).as_deref(),
            Some("Translation is off"),
            "disabled state falls back to English"
        );
    }

    #[test]
    fn test_missing_container_arms_bounded_retry() {
        let dom = parse("<html><body></body></html>");
        let mut sink = DomFooter::new(Selector::parse("#app-shell").unwrap());

        for _ in 0..20 {
            sink.notify(&dom, LanguageCode::Ja, true);
        }
        assert!(footer_of(&dom).is_none());
        assert!(!sink.retry_pending(), "retry budget must be exhausted");

        sink.reset();
        sink.notify(&dom, LanguageCode::Ja, true);
        assert!(sink.retry_pending(), "reset restores the retry budget");
    }

    #[test]
    fn test_language_choice_patch_only_touches_language() {
        let patch = language_choice_patch(LanguageSelection::Off);
        assert_eq!(patch.language, Some(LanguageSelection::Off));
        assert!(patch.enabled.is_none());
        assert!(patch.strict_matching.is_none());
    }
}
