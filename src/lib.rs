//! # Linguify Library
//!
//! 对 HTML 文档做实时、可逆的原地本地化：用双语词典驱动文本替换，
//! 跟踪宿主的后续 DOM 变更，并能随设置切换在任意语言之间无损往返。
//!
//! ## 模块组织
//!
//! - `dictionary` - 词典解析与匹配器编译
//! - `dom` - DOM 解析、遍历与排除选择器
//! - `engine` - 翻译引擎与变更管道
//! - `error` - 错误类型
//! - `footer` - 页脚注入
//! - `locale` - 词典来源：内置、缓存、远程
//! - `settings` - 设置模型与存储接口

pub mod dictionary;
pub mod dom;
pub mod engine;
pub mod error;
pub mod footer;
pub mod locale;
pub mod settings;

// Re-export commonly used items for convenience
pub use dictionary::{compile, parse_dictionary, CompiledMatcherSet, Dictionary, Direction};
pub use engine::{LocalizeEngine, MutationRecord, PipelineState};
pub use error::{LocalizeError, LocalizeResult};
pub use footer::{DomFooter, FooterSink};
pub use locale::LanguageTable;
pub use settings::{LanguageCode, LanguageSelection, Settings, SettingsPatch};
