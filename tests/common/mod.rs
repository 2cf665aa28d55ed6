// 集成测试公共模块
//
// 提供测试页面、DOM 访问和语言表构建的辅助工具

use markup5ever_rcdom::{Handle, NodeData, RcDom};

use linguify::dom::{get_child_node_by_name, get_html_element, html_to_dom, serialize_document};
use linguify::{Dictionary, LanguageCode, LanguageTable};

/// HTML 测试页面助手
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 一个典型的英文管理页面：正文、表单、标题和排除区域
    pub fn create_admin_page() -> String {
        "<html lang=\"en\"><head><title>Settings</title></head><body>\
         <h1>Settings</h1>\
         <p>Publish</p>\
         <div><span>Save draft</span></div>\
         <input placeholder=\"Search\">\
         <div class=\"no-translate\"><p>Publish</p></div>\
         <script>var label = 'Publish';</script>\
         </body></html>"
            .to_string()
    }

    pub fn create_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8".to_string())
    }

    pub fn body(dom: &RcDom) -> Handle {
        let html = get_html_element(dom).expect("document should have html element");
        get_child_node_by_name(&html, "body").expect("document should have body")
    }

    /// 收集子树内所有非空文本（裁剪首尾空白）
    pub fn collect_texts(root: &Handle) -> Vec<String> {
        let mut texts = Vec::new();
        Self::collect_texts_into(root, &mut texts);
        texts
    }

    fn collect_texts_into(node: &Handle, texts: &mut Vec<String>) {
        if let NodeData::Text { ref contents } = node.data {
            let text = contents.borrow().trim().to_string();
            if !text.is_empty() {
                texts.push(text);
            }
        }
        for child in node.children.borrow().iter() {
            Self::collect_texts_into(child, texts);
        }
    }

    pub fn serialized(dom: &RcDom) -> String {
        String::from_utf8(serialize_document(dom)).expect("serialized HTML should be UTF-8")
    }
}

/// 构建只含指定语言词条的语言表
pub fn language_table(languages: &[(LanguageCode, &[(&str, &str)])]) -> LanguageTable {
    let mut table = LanguageTable::new();
    for (code, entries) in languages {
        let dictionary: Dictionary = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        table.update(*code, dictionary);
    }
    table
}
