// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 错误页解析器
//!
//! 给定状态码与配置中的 `error_pages` 表，决定使用磁盘上的自定义页面还是生成的最小 HTML 页面。
//! 这是整个响应生成过程的兜底路径：无论文件系统处于何种状态，都会得到一个状态码、
//! 内容类型和正文长度彼此一致的结果，自身不会失败。

use std::{collections::HashMap, fs};

use bytes::Bytes;
use log::{debug, warn};

use crate::{
    param::reason_phrase,
    util::{check_file_perms, file_content_length, get_mime},
};

/// 生成页面使用的内容类型
pub const GENERATED_PAGE_MIME: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub code: u16,
    pub content_type: &'static str,
    pub body: Bytes,
}

/// 生成的最小错误页，例如 `<h1> <center>404 Not Found <center></h1>`
pub fn generate_error_page(code: u16) -> String {
    format!("<h1> <center>{} {} <center></h1>", code, reason_phrase(code))
}

fn generated(code: u16) -> ErrorPage {
    ErrorPage {
        code,
        content_type: GENERATED_PAGE_MIME,
        body: Bytes::from(generate_error_page(code)),
    }
}

/// # 解析错误页
///
/// 1. 表中有该状态码：先按静态文件的方式取 MIME 与大小，大小取不到时状态码降级为 500；
///    再检查自定义页本身的可读性，可读则整页读入作为正文。
/// 2. 表中没有，或自定义页不可读、读取失败：使用生成的页面。
///
/// 自定义页整页读入，不做截断；正文长度即实际读到的字节数。
pub fn resolve(code: u16, error_pages: &HashMap<u16, String>, id: u64) -> ErrorPage {
    let page_path = match error_pages.get(&code) {
        Some(p) => p,
        None => {
            debug!("[ID{}]状态码{}没有配置自定义错误页，使用生成页面", id, code);
            return generated(code);
        }
    };

    let mut code = code;
    let content_type = get_mime(page_path);
    if let Err(e) = file_content_length(page_path) {
        warn!("[ID{}]无法获取错误页{}的大小：{}，状态码降级为500", id, page_path, e);
        code = 500;
    }

    if check_file_perms(page_path) != 200 {
        warn!("[ID{}]错误页{}不可读，使用生成页面", id, page_path);
        return generated(code);
    }

    match fs::read(page_path) {
        Ok(content) => {
            debug!("[ID{}]使用自定义错误页{}，{} bytes", id, page_path, content.len());
            ErrorPage {
                code,
                content_type,
                body: Bytes::from(content),
            }
        }
        Err(e) => {
            warn!("[ID{}]读取错误页{}失败：{}，使用生成页面", id, page_path, e);
            generated(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    #[test]
    fn test_generated_404_body() {
        assert_eq!(
            generate_error_page(404),
            "<h1> <center>404 Not Found <center></h1>"
        );
    }

    #[test]
    fn test_resolve_without_custom_page() {
        let page = resolve(404, &HashMap::new(), 0);
        assert_eq!(page.code, 404);
        assert_eq!(page.content_type, "text/html");
        assert_eq!(&page.body[..], b"<h1> <center>404 Not Found <center></h1>");
    }

    #[test]
    fn test_resolve_custom_page() {
        let mut file = Builder::new().suffix(".html").tempfile().unwrap();
        file.write_all(b"<p>custom not found</p>").unwrap();
        let mut pages = HashMap::new();
        pages.insert(404, file.path().to_str().unwrap().to_string());

        let page = resolve(404, &pages, 0);
        assert_eq!(page.code, 404);
        assert_eq!(page.content_type, "text/html");
        assert_eq!(&page.body[..], b"<p>custom not found</p>");
    }

    #[test]
    fn test_custom_page_keeps_its_own_mime() {
        let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"gone").unwrap();
        let mut pages = HashMap::new();
        pages.insert(403, file.path().to_str().unwrap().to_string());

        let page = resolve(403, &pages, 0);
        assert_eq!(page.content_type, "text/plain");
    }

    #[test]
    fn test_missing_custom_page_downgrades_to_500() {
        let dir = tempdir().unwrap();
        let mut pages = HashMap::new();
        pages.insert(
            404,
            dir.path().join("nope.html").to_str().unwrap().to_string(),
        );

        let page = resolve(404, &pages, 0);
        assert_eq!(page.code, 500);
        assert_eq!(page.content_type, "text/html");
        assert_eq!(
            &page.body[..],
            b"<h1> <center>500 Internal Server Error <center></h1>"
        );
    }

    #[test]
    fn test_large_custom_page_is_not_truncated() {
        let mut file = Builder::new().suffix(".html").tempfile().unwrap();
        let content = vec![b'x'; 10000];
        file.write_all(&content).unwrap();
        let mut pages = HashMap::new();
        pages.insert(500, file.path().to_str().unwrap().to_string());

        let page = resolve(500, &pages, 0);
        assert_eq!(page.body.len(), 10000);
    }

    #[test]
    fn test_directory_as_custom_page_falls_back() {
        let dir = tempdir().unwrap();
        let mut pages = HashMap::new();
        pages.insert(404, dir.path().to_str().unwrap().to_string());

        let page = resolve(404, &pages, 0);
        assert_eq!(page.code, 404);
        assert_eq!(
            &page.body[..],
            b"<h1> <center>404 Not Found <center></h1>"
        );
        assert_eq!(page.content_type, "text/html");
    }
}
