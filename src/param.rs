// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `enginx` 遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 响应所用的状态码及其原因短语（Reason Phrase）。
//! - 后缀名到 MIME 类型的映射表。
//! - HTTP 方法、版本以及连接模式的强类型枚举。
//!
//! 所有表都在首次访问时初始化一次，之后只读，多线程共享无需加锁。

use std::{collections::HashMap, fmt};

use lazy_static::lazy_static;
use serde_derive::Deserialize;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "EnginX";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 无法识别后缀时使用的兜底 MIME 类型
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// 请求 URI 的最大长度，超过则返回 414
pub const MAX_URI_LENGTH: usize = 2048;

/// 请求头部（请求行 + 各个标头）的最大字节数
pub const MAX_HEADER_SIZE: usize = 8192;

lazy_static! {
    /// HTTP 状态码与其对应的原因短语映射表。
    ///
    /// 响应中出现的每一个状态码都必须在此表中；配置文件里的 `error_pages` 键也以此表校验。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        // 2xx: 成功响应 (Successful)
        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");

        // 3xx: 重定向 (Redirection)
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(304, "Not Modified");

        // 4xx: 客户端错误 (Client Error)
        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(411, "Length Required");
        map.insert(413, "Request Entity Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");

        // 5xx: 服务端错误 (Server Error)
        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(503, "Service Unavailable");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名（不含点，小写）到 MIME 类型的映射表。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("html", "text/html");
        map.insert("htm", "text/html");
        map.insert("css", "text/css");
        map.insert("js", "application/javascript");
        map.insert("mjs", "application/javascript");
        map.insert("json", "application/json");
        map.insert("xml", "application/xml");
        map.insert("txt", "text/plain");
        map.insert("csv", "text/csv");
        map.insert("md", "text/markdown");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("png", "image/png");
        map.insert("gif", "image/gif");
        map.insert("bmp", "image/bmp");
        map.insert("ico", "image/x-icon");
        map.insert("svg", "image/svg+xml");
        map.insert("webp", "image/webp");
        map.insert("avif", "image/avif");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("ttf", "font/ttf");
        map.insert("otf", "font/otf");
        map.insert("pdf", "application/pdf");
        map.insert("zip", "application/zip");
        map.insert("tar", "application/x-tar");
        map.insert("gz", "application/gzip");
        map.insert("7z", "application/x-7z-compressed");
        map.insert("wasm", "application/wasm");
        map.insert("mp3", "audio/mpeg");
        map.insert("wav", "audio/wav");
        map.insert("ogg", "audio/ogg");
        map.insert("mp4", "video/mp4");
        map.insert("mpeg", "video/mpeg");
        map.insert("webm", "video/webm");
        map.insert("avi", "video/x-msvideo");
        map.insert("doc", "application/msword");
        map.insert(
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        );
        map.insert("xls", "application/vnd.ms-excel");
        map.insert(
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        map.insert("ppt", "application/vnd.ms-powerpoint");
        map.insert(
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        );
        map
    };
}

/// 查询状态码的原因短语。表外的状态码返回占位文本而不是 panic，
/// 保证错误页生成路径永远不会失败。
pub fn reason_phrase(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status")
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// 词法层面能识别的 HTTP 请求方法。
///
/// 只有 GET / POST / DELETE 有实际语义，其余方法在路由允许的情况下会得到 501。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl HttpRequestMethod {
    /// 从已转为大写的方法名解析，未知方法返回 `None`
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }
}

/// `Connection` 响应头的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    KeepAlive,
    Close,
}

impl ConnectionMode {
    /// 仅当请求的 `Connection` 头为 `close` 时关闭，其余情况（包括缺失）保持连接
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("close") => ConnectionMode::Close,
            _ => ConnectionMode::KeepAlive,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "HTTP/1.0"),
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Patch => "PATCH",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConnectionMode::KeepAlive => write!(f, "keep-alive"),
            ConnectionMode::Close => write!(f, "close"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_reason_phrases() {
        for (code, phrase) in [
            (200, "OK"),
            (201, "Created"),
            (204, "No Content"),
            (301, "Moved Permanently"),
            (403, "Forbidden"),
            (404, "Not Found"),
            (405, "Method Not Allowed"),
            (413, "Request Entity Too Large"),
            (500, "Internal Server Error"),
            (501, "Not Implemented"),
        ] {
            assert_eq!(reason_phrase(code), phrase);
        }
    }

    #[test]
    fn test_unknown_reason_phrase_does_not_panic() {
        assert_eq!(reason_phrase(999), "Unknown Status");
    }

    #[test]
    fn test_method_parse_and_display() {
        for token in ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"] {
            let method = HttpRequestMethod::parse(token).unwrap();
            assert_eq!(method.to_string(), token);
        }
        assert!(HttpRequestMethod::parse("BREW").is_none());
        assert!(HttpRequestMethod::parse("get").is_none());
    }

    #[test]
    fn test_connection_mode() {
        assert_eq!(ConnectionMode::from_header(Some("close")), ConnectionMode::Close);
        assert_eq!(ConnectionMode::from_header(Some("Close")), ConnectionMode::Close);
        assert_eq!(
            ConnectionMode::from_header(Some("keep-alive")),
            ConnectionMode::KeepAlive
        );
        assert_eq!(ConnectionMode::from_header(None), ConnectionMode::KeepAlive);
        assert_eq!(ConnectionMode::Close.to_string(), "close");
        assert_eq!(ConnectionMode::KeepAlive.to_string(), "keep-alive");
    }

    #[test]
    fn test_mime_table_keys_have_no_dot() {
        assert!(MIME_TYPES.keys().all(|k| !k.starts_with('.')));
        assert_eq!(MIME_TYPES.get("html"), Some(&"text/html"));
    }
}
