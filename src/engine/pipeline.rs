//! 变更管道
//!
//! 观察宿主对 DOM 的持续修改，把脏节点 / 脏元素累积到待处理集合，
//! 并按渲染节奏批量刷新。状态机：
//! `Idle → Observing → Dirty → Flushing → Observing` 循环，
//! 翻译被关闭时从任意状态进入 `Disconnected`。
//!
//! 关键不变量是"暂停-产出-恢复"：刷新本身会修改 DOM，刷新期间
//! 观察必须挂起（[`MutationPipeline::begin_flush`]），否则引擎自己的
//! 写入会重新触发观察回调，形成无限同步循环。

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

/// 刷新调度原语缺失时的固定回退延迟
pub const FALLBACK_FLUSH_DELAY: Duration = Duration::from_millis(16);

/// 管道状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Observing,
    Dirty,
    Flushing,
    Disconnected,
}

/// 一条 DOM 变更记录，由宿主在变更发生时上报
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 文本节点内容变更
    CharacterData(Handle),
    /// 新增节点（文本或元素，元素将被整棵子树扫描）
    ChildAdded(Handle),
    /// 元素的 placeholder 属性变更
    PlaceholderAttr(Handle),
    /// `<title>` 内容变更（独立观察面）
    TitleChanged,
}

/// 以 Rc 指针身份去重的节点集合
#[derive(Debug, Default)]
pub struct NodeSet {
    entries: HashMap<usize, Handle>,
}

impl NodeSet {
    fn insert(&mut self, node: Handle) {
        self.entries.insert(Rc::as_ptr(&node) as usize, node);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn drain(&mut self) -> Vec<Handle> {
        self.entries.drain().map(|(_, node)| node).collect()
    }
}

/// 待处理变更集合：脏文本节点 + 脏元素 + title 标记
#[derive(Debug, Default)]
pub struct PendingSets {
    pub text_nodes: NodeSet,
    pub elements: NodeSet,
    pub title_dirty: bool,
}

impl PendingSets {
    pub fn is_empty(&self) -> bool {
        self.text_nodes.is_empty() && self.elements.is_empty() && !self.title_dirty
    }

    fn clear(&mut self) {
        self.text_nodes.clear();
        self.elements.clear();
        self.title_dirty = false;
    }
}

/// 变更管道
#[derive(Debug)]
pub struct MutationPipeline {
    state: PipelineState,
    pending: PendingSets,
    flush_scheduled: bool,
    flush_deadline: Option<Instant>,
    fallback_delay: Duration,
}

impl Default for MutationPipeline {
    fn default() -> Self {
        MutationPipeline::new(FALLBACK_FLUSH_DELAY)
    }
}

impl MutationPipeline {
    pub fn new(fallback_delay: Duration) -> Self {
        MutationPipeline {
            state: PipelineState::Idle,
            pending: PendingSets::default(),
            flush_scheduled: false,
            flush_deadline: None,
            fallback_delay,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 开始观察（引擎启用时调用）
    pub fn connect(&mut self) {
        tracing::debug!(from = ?self.state, "变更管道进入观察状态");
        self.state = PipelineState::Observing;
    }

    /// 断开观察并无条件清空待处理集合
    ///
    /// 断开后不保证任何刷新完成，这是关闭翻译 / 页面卸载的语义。
    pub fn disconnect(&mut self) {
        tracing::debug!(from = ?self.state, "变更管道断开");
        self.state = PipelineState::Disconnected;
        self.pending.clear();
        self.flush_scheduled = false;
        self.flush_deadline = None;
    }

    pub fn is_observing(&self) -> bool {
        matches!(self.state, PipelineState::Observing | PipelineState::Dirty)
    }

    /// 上报一条变更记录
    ///
    /// 仅在观察状态下接收；刷新期间到达的记录是引擎自身写入的
    /// 回声，被丢弃以避免反馈循环。返回记录是否被接收。
    pub fn record(&mut self, record: MutationRecord) -> bool {
        if !self.is_observing() {
            return false;
        }

        match record {
            MutationRecord::CharacterData(node) => self.pending.text_nodes.insert(node),
            MutationRecord::ChildAdded(node) => {
                if crate::dom::get_node_name(&node).is_some() {
                    self.pending.elements.insert(node);
                } else {
                    self.pending.text_nodes.insert(node);
                }
            }
            MutationRecord::PlaceholderAttr(element) => self.pending.elements.insert(element),
            MutationRecord::TitleChanged => self.pending.title_dirty = true,
        }

        if !self.pending.is_empty() {
            self.state = PipelineState::Dirty;
            self.schedule_flush();
        }
        true
    }

    /// 调度一次刷新；已有计划中的刷新时为空操作（突发合并）
    fn schedule_flush(&mut self) {
        if self.flush_scheduled {
            return;
        }
        self.flush_scheduled = true;
        self.flush_deadline = Some(Instant::now() + self.fallback_delay);
        tracing::debug!(
            text_nodes = self.pending.text_nodes.len(),
            elements = self.pending.elements.len(),
            "已调度刷新"
        );
    }

    /// 是否有计划中的刷新
    pub fn flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// 回退延迟是否已到（宿主没有渲染节拍时的固定延迟路径）
    pub fn flush_due(&self, now: Instant) -> bool {
        match self.flush_deadline {
            Some(deadline) => self.flush_scheduled && now >= deadline,
            None => false,
        }
    }

    /// 开始刷新：挂起观察并原子地取走全部待处理集合
    ///
    /// 必须先挂起再处理——刷新期间的替换操作会修改 DOM。
    pub fn begin_flush(&mut self) -> PendingSets {
        self.state = PipelineState::Flushing;
        self.flush_scheduled = false;
        self.flush_deadline = None;
        std::mem::take(&mut self.pending)
    }

    /// 结束刷新：仍启用时恢复观察
    ///
    /// 刷新期间（例如页脚回调引发的再入）重新累积的脏条目不被
    /// 同步处理，而是调度一次新的刷新，以约束单次刷新时长。
    pub fn finish_flush(&mut self, still_enabled: bool) {
        if !still_enabled {
            self.disconnect();
            return;
        }

        if self.pending.is_empty() {
            self.state = PipelineState::Observing;
        } else {
            self.state = PipelineState::Dirty;
            self.schedule_flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{create_element_node, create_text_node};

    #[test]
    fn test_initial_state_is_idle() {
        let pipeline = MutationPipeline::default();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(!pipeline.flush_scheduled());
    }

    #[test]
    fn test_records_dropped_before_connect() {
        let mut pipeline = MutationPipeline::default();
        assert!(!pipeline.record(MutationRecord::TitleChanged));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_burst_coalesces_into_single_flush() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();

        let nodes: Vec<_> = (0..5).map(|_| create_text_node("dirty")).collect();
        for node in &nodes {
            assert!(pipeline.record(MutationRecord::CharacterData(node.clone())));
        }
        assert_eq!(pipeline.state(), PipelineState::Dirty);
        assert!(pipeline.flush_scheduled());

        let pending = pipeline.begin_flush();
        assert_eq!(pending.text_nodes.len(), 5, "one flush covers all records");
        assert!(!pipeline.flush_scheduled());
    }

    #[test]
    fn test_set_semantics_deduplicate() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();

        let node = create_text_node("dirty");
        pipeline.record(MutationRecord::CharacterData(node.clone()));
        pipeline.record(MutationRecord::CharacterData(node.clone()));

        let pending = pipeline.begin_flush();
        assert_eq!(pending.text_nodes.len(), 1);
    }

    #[test]
    fn test_added_nodes_are_classified() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();

        pipeline.record(MutationRecord::ChildAdded(create_text_node("t")));
        pipeline.record(MutationRecord::ChildAdded(create_element_node("div", vec![])));

        let pending = pipeline.begin_flush();
        assert_eq!(pending.text_nodes.len(), 1);
        assert_eq!(pending.elements.len(), 1);
    }

    #[test]
    fn test_records_during_flush_are_dropped() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();
        pipeline.record(MutationRecord::TitleChanged);

        let _pending = pipeline.begin_flush();
        assert_eq!(pipeline.state(), PipelineState::Flushing);
        assert!(
            !pipeline.record(MutationRecord::CharacterData(create_text_node("echo"))),
            "engine's own writes must not re-enter the pipeline"
        );

        pipeline.finish_flush(true);
        assert_eq!(pipeline.state(), PipelineState::Observing);
    }

    #[test]
    fn test_disconnect_clears_pending_unconditionally() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();
        pipeline.record(MutationRecord::CharacterData(create_text_node("dirty")));
        assert!(pipeline.flush_scheduled());

        pipeline.disconnect();
        assert_eq!(pipeline.state(), PipelineState::Disconnected);
        assert!(!pipeline.flush_scheduled());
        assert!(pipeline.begin_flush().is_empty());
    }

    #[test]
    fn test_fallback_deadline() {
        let mut pipeline = MutationPipeline::new(Duration::from_millis(0));
        pipeline.connect();
        pipeline.record(MutationRecord::TitleChanged);
        assert!(pipeline.flush_due(Instant::now() + Duration::from_millis(1)));
    }

    #[test]
    fn test_finish_flush_reschedules_when_dirty_again() {
        let mut pipeline = MutationPipeline::default();
        pipeline.connect();
        pipeline.record(MutationRecord::TitleChanged);

        let _pending = pipeline.begin_flush();
        // 模拟刷新期间由再入路径直接标脏（绕过 record 的挂起判定）
        pipeline.pending.title_dirty = true;
        pipeline.finish_flush(true);

        assert_eq!(pipeline.state(), PipelineState::Dirty);
        assert!(pipeline.flush_scheduled());
    }
}
