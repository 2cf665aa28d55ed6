//! 设置模型
//!
//! 将原本以鸭子类型对象传递的设置建模为完整类型化的配置值，
//! 合并（merge）是纯函数，从不原地修改。设置存储是外部协作方，
//! 通过 [`SettingsStore`] 接口接入；读取失败时回退到默认值。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{LocalizeError, LocalizeResult};

/// 支持的目标语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageCode {
    Ja,
    ZhTw,
    ZhCn,
    Ko,
}

/// 默认语言
pub const DEFAULT_LANGUAGE: LanguageCode = LanguageCode::Ja;

impl LanguageCode {
    pub const ALL: &'static [LanguageCode] = &[
        LanguageCode::Ja,
        LanguageCode::ZhTw,
        LanguageCode::ZhCn,
        LanguageCode::Ko,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::Ja => "ja",
            LanguageCode::ZhTw => "zh-TW",
            LanguageCode::ZhCn => "zh-CN",
            LanguageCode::Ko => "ko",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = LocalizeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ja" => Ok(LanguageCode::Ja),
            "zh-TW" => Ok(LanguageCode::ZhTw),
            "zh-CN" => Ok(LanguageCode::ZhCn),
            "ko" => Ok(LanguageCode::Ko),
            other => Err(LocalizeError::Storage(format!(
                "unknown language code: {}",
                other
            ))),
        }
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CodeVisitor;

        impl Visitor<'_> for CodeVisitor {
            type Value = LanguageCode;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a language code string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LanguageCode, E> {
                value.parse().map_err(|_| {
                    de::Error::unknown_variant(value, &["ja", "zh-TW", "zh-CN", "ko"])
                })
            }
        }

        deserializer.deserialize_str(CodeVisitor)
    }
}

/// 语言选择："off" 表示禁用但保留当前语言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSelection {
    Off,
    Language(LanguageCode),
}

impl LanguageSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageSelection::Off => "off",
            LanguageSelection::Language(code) => code.as_str(),
        }
    }

    pub fn code(&self) -> Option<LanguageCode> {
        match self {
            LanguageSelection::Off => None,
            LanguageSelection::Language(code) => Some(*code),
        }
    }
}

impl FromStr for LanguageSelection {
    type Err = LocalizeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "off" {
            Ok(LanguageSelection::Off)
        } else {
            value.parse().map(LanguageSelection::Language)
        }
    }
}

impl Serialize for LanguageSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LanguageSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SelectionVisitor;

        impl Visitor<'_> for SelectionVisitor {
            type Value = LanguageSelection;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a language code string or \"off\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LanguageSelection, E> {
                value.parse().map_err(|_| {
                    de::Error::unknown_variant(value, &["ja", "zh-TW", "zh-CN", "ko", "off"])
                })
            }
        }

        deserializer.deserialize_str(SelectionVisitor)
    }
}

/// 进程级翻译设置，由外部设置存储持久化，是驱动引擎状态的唯一来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub language: LanguageSelection,
    pub enabled: bool,
    pub strict_matching: bool,
    pub use_cdn: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            language: LanguageSelection::Language(DEFAULT_LANGUAGE),
            enabled: true,
            strict_matching: true,
            use_cdn: true,
        }
    }
}

/// 部分设置更新（来自变更通知或页脚 UI 回调）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_matching: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_cdn: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.language.is_none()
            && self.enabled.is_none()
            && self.strict_matching.is_none()
            && self.use_cdn.is_none()
    }
}

impl Settings {
    /// 纯合并：以 patch 中出现的字段覆盖当前值，返回新设置
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        Settings {
            language: patch.language.unwrap_or(self.language),
            enabled: patch.enabled.unwrap_or(self.enabled),
            strict_matching: patch.strict_matching.unwrap_or(self.strict_matching),
            use_cdn: patch.use_cdn.unwrap_or(self.use_cdn),
        }
    }
}

/// 外部设置存储接口
///
/// 读取失败被视为可恢复错误：调用方记录日志并使用默认值。
pub trait SettingsStore {
    fn load(&self) -> LocalizeResult<Settings>;
    fn save(&mut self, patch: &SettingsPatch) -> LocalizeResult<()>;
}

/// 加载设置，失败时回退到默认值
pub fn load_or_default(store: &dyn SettingsStore) -> Settings {
    match store.load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("无法读取已保存的设置，使用默认值: {}", err);
            Settings::default()
        }
    }
}

/// 内存设置存储（用于测试和嵌入场景）
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: HashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> LocalizeResult<Settings> {
        let defaults = Settings::default();
        let language = match self.values.get("language") {
            Some(raw) => raw.parse()?,
            None => defaults.language,
        };
        let parse_flag = |key: &str, fallback: bool| match self.values.get(key) {
            Some(raw) => raw == "true",
            None => fallback,
        };
        Ok(Settings {
            language,
            enabled: parse_flag("enabled", defaults.enabled),
            strict_matching: parse_flag("strict_matching", defaults.strict_matching),
            use_cdn: parse_flag("use_cdn", defaults.use_cdn),
        })
    }

    fn save(&mut self, patch: &SettingsPatch) -> LocalizeResult<()> {
        if let Some(language) = patch.language {
            self.values
                .insert("language".to_string(), language.as_str().to_string());
        }
        if let Some(enabled) = patch.enabled {
            self.values
                .insert("enabled".to_string(), enabled.to_string());
        }
        if let Some(strict) = patch.strict_matching {
            self.values
                .insert("strict_matching".to_string(), strict.to_string());
        }
        if let Some(use_cdn) = patch.use_cdn {
            self.values
                .insert("use_cdn".to_string(), use_cdn.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_roundtrip() {
        for code in LanguageCode::ALL {
            let parsed: LanguageCode = code.as_str().parse().expect("should parse back");
            assert_eq!(parsed, *code);
        }
        assert!("fr".parse::<LanguageCode>().is_err());
    }

    #[test]
    fn test_selection_off() {
        let off: LanguageSelection = "off".parse().unwrap();
        assert_eq!(off, LanguageSelection::Off);
        assert_eq!(off.code(), None);
    }

    #[test]
    fn test_settings_merge_is_pure() {
        let base = Settings::default();
        let patch = SettingsPatch {
            enabled: Some(false),
            ..Default::default()
        };

        let merged = base.merged(&patch);
        assert!(!merged.enabled);
        assert_eq!(merged.language, base.language, "untouched fields survive");
        assert!(base.enabled, "merge must not mutate the original");
    }

    #[test]
    fn test_settings_serde() {
        let settings = Settings {
            language: LanguageSelection::Language(LanguageCode::ZhTw),
            enabled: true,
            strict_matching: false,
            use_cdn: false,
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"zh-TW\""));

        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_memory_store_partial_save() {
        let mut store = MemorySettingsStore::new();
        store
            .save(&SettingsPatch {
                language: Some(LanguageSelection::Language(LanguageCode::Ko)),
                ..Default::default()
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(
            loaded.language,
            LanguageSelection::Language(LanguageCode::Ko)
        );
        assert!(loaded.enabled, "unset keys fall back to defaults");
    }
}
