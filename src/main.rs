//! 命令行入口
//!
//! 读入 HTML 文件，按选定语言做一次完整的本地化，再把结果写出。
//! 主要用于批处理和调试词典，实时变更跟踪由库的嵌入方驱动。

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use linguify::dom::{html_to_dom, serialize_document};
use linguify::locale::cache::LocaleCache;
use linguify::locale::fetch::refresh_languages;
use linguify::settings::DEFAULT_LANGUAGE;
use linguify::{
    parse_dictionary, DomFooter, LanguageSelection, LanguageTable, LocalizeEngine, LocalizeResult,
    Settings,
};

#[derive(Parser)]
#[command(name = "linguify", version, about = "对 HTML 文档做词典驱动的原地本地化")]
struct Cli {
    /// 输入 HTML 文件
    input: PathBuf,

    /// 目标语言（ja / zh-TW / zh-CN / ko / off）
    #[arg(short, long, default_value = "ja")]
    language: String,

    /// 额外词典 JSON 文件，覆盖目标语言的内置词典
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// 使用传统部分匹配（默认为精确匹配）
    #[arg(long)]
    partial: bool,

    /// 逗号分隔的排除选择器，如 ".no-translate,#sidebar"
    #[arg(long, default_value = "")]
    exclude: String,

    /// 先从远程端点刷新目标语言的词典
    #[arg(long)]
    remote: bool,

    /// 远程刷新时跳过 CDN，直连词典仓库
    #[arg(long, requires = "remote")]
    no_cdn: bool,

    /// 输入文档的字符编码
    #[arg(long, default_value = "utf-8")]
    charset: String,

    /// 输出文件；缺省写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> LocalizeResult<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let selection: LanguageSelection = cli.language.parse()?;
    let language = selection.code().unwrap_or(DEFAULT_LANGUAGE);

    let mut table = LanguageTable::new();

    if cli.remote {
        let mut cache = LocaleCache::new();
        for (code, dictionary) in refresh_languages(&[language], &mut cache, !cli.no_cdn) {
            table.update(code, dictionary);
        }
    }

    if let Some(path) = cli.dictionary.as_ref() {
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        table.update(language, parse_dictionary(value)?);
    }

    let exclusions: Vec<String> = cli
        .exclude
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let data = fs::read(&cli.input)?;
    let dom = html_to_dom(&data, cli.charset.clone());

    let mut engine = LocalizeEngine::new(dom, table, &exclusions);
    engine.set_footer(Box::new(DomFooter::default()));
    engine.apply_settings(Settings {
        language: selection,
        strict_matching: !cli.partial,
        use_cdn: !cli.no_cdn,
        ..Settings::default()
    });

    let html = serialize_document(engine.dom());
    match cli.output {
        Some(path) => fs::write(path, html)?,
        None => std::io::stdout().write_all(&html)?,
    }

    Ok(())
}
