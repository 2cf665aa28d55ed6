//! 统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。本引擎中没有任何错误会传播到
//! 宿主文档层面：所有错误都以"保留原始文本"的方式收敛。

use thiserror::Error;

/// 本地化引擎错误类型
#[derive(Error, Debug)]
pub enum LocalizeError {
    /// 字典数据格式错误（非字符串映射的 JSON）
    #[error("字典数据格式错误: {0}")]
    MalformedDictionary(String),

    /// 远程词典获取失败（非 2xx 状态码）
    #[error("词典获取失败: {0}")]
    Fetch(String),

    /// 设置 / 缓存存储读写失败
    #[error("存储错误: {0}")]
    Storage(String),

    /// 排除选择器解析失败
    #[error("选择器解析失败: {0}")]
    Selector(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 序列化错误
    #[error("JSON序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

impl LocalizeError {
    /// 检查错误是否可在下一个数据源 / 下一次尝试中恢复
    pub fn is_recoverable(&self) -> bool {
        match self {
            LocalizeError::MalformedDictionary(_) => true,
            LocalizeError::Fetch(_) => true,
            LocalizeError::Storage(_) => true,
            LocalizeError::Network(_) => true,
            LocalizeError::Io(_) => true,
            LocalizeError::Serialization(_) => true,
            // 配置问题需要修正选择器列表本身
            LocalizeError::Selector(_) => false,
        }
    }
}

/// 错误结果类型别名
pub type LocalizeResult<T> = Result<T, LocalizeError>;
