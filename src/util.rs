// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{
    fs::{self, File},
    io::{self, ErrorKind},
    path::Path,
};

use chrono::{DateTime, Utc};

use crate::param::{DEFAULT_MIME, MIME_TYPES};

/// 根据路径的后缀名查找 MIME 类型，未知或缺失后缀时返回 `application/octet-stream`
pub fn get_mime(path: &str) -> &'static str {
    let extension = match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return DEFAULT_MIME,
    };
    MIME_TYPES.get(extension.as_str()).copied().unwrap_or(DEFAULT_MIME)
}

/// 文件权限分类：存在且可读为 200，存在但不可读为 403，不存在为 404
pub fn check_file_perms(path: &str) -> u16 {
    match fs::metadata(path) {
        Ok(_) => match File::open(path) {
            Ok(_) => 200,
            Err(_) => 403,
        },
        Err(e) if e.kind() == ErrorKind::PermissionDenied => 403,
        Err(_) => 404,
    }
}

/// 通过 `stat` 获取文件大小
pub fn file_content_length(path: &str) -> io::Result<u64> {
    fs::metadata(path).map(|m| m.len())
}

pub fn is_directory(path: &str) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// RFC 7231 IMF-fixdate，例如 `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 链接目标中的文件名：除字母数字与 `-._~` 之外的字节都编码为 `%XX`
pub fn encode_href(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// 自动索引中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

pub struct HtmlBuilder {
    title: String,
    body: String,
}

impl HtmlBuilder {
    /// 目录列表页。目录项的链接和显示文本都追加 `/`。
    pub fn from_dir(uri: &str, entries: &mut [IndexEntry], list_parent: bool) -> Self {
        sort_dir_entries(entries);
        let uri = escape_html(uri);

        let mut body = format!("<h1>Index of {}</h1><hr><pre>", uri);
        if list_parent {
            body.push_str("<a href=\"../\">../</a>\n");
        }
        for entry in entries.iter() {
            let href = encode_href(&entry.name);
            let name = escape_html(&entry.name);
            if entry.is_dir {
                body.push_str(&format!("<a href=\"{}/\">{}/</a>\n", href, name));
            } else {
                body.push_str(&format!(
                    "<a href=\"{}\">{}</a>  {}\n",
                    href,
                    name,
                    format_file_size(entry.size)
                ));
            }
        }
        body.push_str("</pre><hr>");

        Self {
            title: format!("Index of {}", uri),
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            self.title, self.body
        )
    }
}

/// 目录在前，其余按名称排序
fn sort_dir_entries(vec: &mut [IndexEntry]) {
    vec.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
}
