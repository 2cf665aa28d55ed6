//! 翻译引擎
//!
//! 持有文档、编译后的正反向匹配器和变更管道，是设置与 DOM 之间
//! 唯一的协调点。核心约定是可逆性：任何设置变更先用旧的反向
//! 匹配器把文档还原为源语言，再按新设置重新翻译，从不在译文
//! 之上叠加翻译。

pub mod pipeline;

use std::time::Instant;

use markup5ever_rcdom::{Handle, RcDom};

use crate::dictionary::{compile, CompiledMatcherSet, Direction};
use crate::dom::selector::ExclusionList;
use crate::dom::walker::{
    is_skippable_element, should_skip_text_node, walk_placeholder_elements, walk_text_nodes,
};
use crate::dom::{
    get_child_node_by_name, get_html_element, get_node_attr, get_text_content, get_title_element,
    set_node_attr, set_text_content,
};
use crate::footer::{FooterSink, FOOTER_ID};
use crate::locale::LanguageTable;
use crate::settings::{LanguageCode, Settings, SettingsPatch, DEFAULT_LANGUAGE};

pub use pipeline::{MutationPipeline, MutationRecord, PipelineState};

/// 翻译引擎
pub struct LocalizeEngine {
    dom: RcDom,
    settings: Settings,
    current_language: LanguageCode,
    enabled: bool,
    forward: CompiledMatcherSet,
    reverse: CompiledMatcherSet,
    locales: LanguageTable,
    pipeline: MutationPipeline,
    exclusions: ExclusionList,
    footer: Option<Box<dyn FooterSink>>,
    /// 宿主文档原有的 html lang 属性，禁用翻译时还原
    original_lang: Option<String>,
}

impl LocalizeEngine {
    /// 创建引擎；未应用任何设置前文档保持原样
    pub fn new(dom: RcDom, locales: LanguageTable, raw_exclusions: &[String]) -> Self {
        let original_lang =
            get_html_element(&dom).and_then(|html| get_node_attr(&html, "lang"));

        // 注入的页脚自身永不参与翻译
        let mut selectors: Vec<String> = raw_exclusions.to_vec();
        selectors.push(format!("#{}", FOOTER_ID));

        LocalizeEngine {
            dom,
            settings: Settings::default(),
            current_language: DEFAULT_LANGUAGE,
            enabled: false,
            forward: CompiledMatcherSet::default(),
            reverse: CompiledMatcherSet::default(),
            locales,
            pipeline: MutationPipeline::default(),
            exclusions: ExclusionList::new(&selectors),
            footer: None,
            original_lang,
        }
    }

    pub fn set_footer(&mut self, footer: Box<dyn FooterSink>) {
        self.footer = Some(footer);
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn into_dom(self) -> RcDom {
        self.dom
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_language(&self) -> LanguageCode {
        self.current_language
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// 应用一份完整设置
    ///
    /// 步骤顺序是引擎的核心不变量：
    /// 1. 若当前处于已翻译状态，用旧反向匹配器还原全文并断开管道；
    /// 2. 解析目标语言（"off" 保留当前语言，只影响启用判定）；
    /// 3. 计算生效开关：enabled 且语言未选 "off"；
    /// 4. 对解析出的词典重建正反两套匹配器；
    /// 5. 启用时改写 html lang，禁用时还原宿主原值；
    /// 6. 启用时全文翻译并连接管道；
    /// 7. 无论启停，通知页脚同步状态。
    pub fn apply_settings(&mut self, settings: Settings) {
        if let Some(footer) = self.footer.as_mut() {
            footer.reset();
        }

        if self.enabled {
            self.process_document(Direction::Reverse);
            self.pipeline.disconnect();
        }

        if let Some(code) = settings.language.code() {
            self.current_language = code;
        }
        self.enabled = settings.enabled && settings.language.code().is_some();

        let dictionary = self.locales.resolve(self.current_language).clone();
        self.forward = compile(&dictionary, Direction::Forward, settings.strict_matching);
        self.reverse = compile(&dictionary, Direction::Reverse, settings.strict_matching);
        self.settings = settings;

        if let Some(html) = get_html_element(&self.dom) {
            if self.enabled {
                set_node_attr(
                    &html,
                    "lang",
                    Some(self.current_language.as_str().to_string()),
                );
            } else {
                set_node_attr(&html, "lang", self.original_lang.clone());
            }
        }

        if self.enabled {
            self.process_document(Direction::Forward);
            self.pipeline.connect();
        }

        if let Some(footer) = self.footer.as_mut() {
            footer.notify(&self.dom, self.current_language, self.enabled);
        }

        tracing::info!(
            language = %self.current_language,
            enabled = self.enabled,
            strict = self.settings.strict_matching,
            "设置已应用"
        );
    }

    /// 以部分更新驱动引擎（设置存储的变更通知入口）
    pub fn on_settings_changed(&mut self, patch: &SettingsPatch) {
        if patch.is_empty() {
            return;
        }
        let merged = self.settings.merged(patch);
        self.apply_settings(merged);
    }

    /// 上报一条 DOM 变更；返回记录是否被管道接收
    pub fn notify_mutation(&mut self, record: MutationRecord) -> bool {
        self.pipeline.record(record)
    }

    /// 批量上报变更
    pub fn notify_mutations<I: IntoIterator<Item = MutationRecord>>(&mut self, records: I) {
        for record in records {
            self.pipeline.record(record);
        }
    }

    pub fn flush_scheduled(&self) -> bool {
        self.pipeline.flush_scheduled()
    }

    /// 回退延迟到期时刷新（宿主无渲染节拍的驱动方式）
    pub fn flush_if_due(&mut self, now: Instant) {
        if self.pipeline.flush_due(now) {
            self.flush();
        }
    }

    /// 刷新一批待处理变更
    ///
    /// 刷新期间管道处于挂起态，引擎自身的写入不会再次入队。
    pub fn flush(&mut self) {
        if !self.enabled {
            return;
        }

        let mut pending = self.pipeline.begin_flush();
        let mut touched = 0usize;

        for node in pending.text_nodes.drain() {
            if should_skip_text_node(&node, &self.exclusions) {
                continue;
            }
            touched += usize::from(Self::apply_to_text(&self.forward, &node));
        }

        for element in pending.elements.drain() {
            if self.exclusions.matches_ancestry(&element) {
                continue;
            }
            if !is_skippable_element(&element, &self.exclusions) {
                for text in walk_text_nodes(&element, &self.exclusions) {
                    touched += usize::from(Self::apply_to_text(&self.forward, &text));
                }
            }
            for input in walk_placeholder_elements(&element, &self.exclusions) {
                touched += usize::from(Self::apply_to_placeholder(&self.forward, &input));
            }
        }

        if pending.title_dirty {
            touched += usize::from(self.process_title(Direction::Forward));
        }

        if touched > 0 {
            tracing::debug!(nodes = touched, "刷新批次完成");
        }

        if let Some(footer) = self.footer.as_mut() {
            footer.notify(&self.dom, self.current_language, self.enabled);
        }

        self.pipeline.finish_flush(self.enabled);
    }

    fn matcher(&self, direction: Direction) -> &CompiledMatcherSet {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Reverse => &self.reverse,
        }
    }

    /// 对整个文档做一次翻译或还原
    fn process_document(&mut self, direction: Direction) {
        let set = self.matcher(direction);
        if set.is_empty() {
            return;
        }

        let Some(root) = self.content_root() else {
            return;
        };

        for node in walk_text_nodes(&root, &self.exclusions) {
            Self::apply_to_text(set, &node);
        }
        for input in walk_placeholder_elements(&root, &self.exclusions) {
            Self::apply_to_placeholder(set, &input);
        }

        self.process_title(direction);
    }

    /// `<title>` 是独立的可翻译面
    fn process_title(&self, direction: Direction) -> bool {
        let set = self.matcher(direction);
        let Some(title) = get_title_element(&self.dom) else {
            return false;
        };
        let Some(text) = title.children.borrow().first().cloned() else {
            return false;
        };
        Self::apply_to_text(set, &text)
    }

    fn content_root(&self) -> Option<Handle> {
        let html = get_html_element(&self.dom)?;
        get_child_node_by_name(&html, "body").or(Some(html))
    }

    fn apply_to_text(set: &CompiledMatcherSet, node: &Handle) -> bool {
        let Some(text) = get_text_content(node) else {
            return false;
        };
        let applied = set.apply(&text);
        if applied.changed {
            set_text_content(node, &applied.updated);
        }
        applied.changed
    }

    fn apply_to_placeholder(set: &CompiledMatcherSet, element: &Handle) -> bool {
        let Some(placeholder) = get_node_attr(element, "placeholder") else {
            return false;
        };
        let applied = set.apply(&placeholder);
        if applied.changed {
            set_node_attr(element, "placeholder", Some(applied.updated));
        }
        applied.changed
    }
}
