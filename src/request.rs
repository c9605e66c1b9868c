// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 负责把从 TCP 流中读取的原始字节解析为 `Request` 结构体：
//! 1. 请求行（Request-Line）的解析（方法、URI、版本），使用正则做格式校验。
//! 2. 标头（Headers）的提取，字段名统一转为小写，查询时大小写不敏感。
//! 3. 记录头部之后已经读到的那部分请求体。
//!
//! 这里只做词法层面的工作；路由匹配、方法许可和请求体大小限制由 `router` 模块完成。

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::error;
use regex::Regex;

use crate::{exception::Exception, param::*};

lazy_static! {
    static ref REQUEST_LINE: Regex =
        Regex::new(r"^([A-Za-z]+) (\S+) (HTTP/\d\.\d)$").expect("request line regex");
}

/// 头部与请求体之间的分隔符
const HEADER_END: &[u8] = b"\r\n\r\n";

/// 返回头部结束位置（分隔符之后的第一个字节下标）
pub fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
        .map(|pos| pos + HEADER_END.len())
}

/// 一个完成词法解析的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 原始 URI，包含查询字符串
    uri: String,
    version: HttpVersion,
    /// 小写字段名 -> 值
    headers: HashMap<String, String>,
    /// 与头部一同读到的请求体前缀，可能不完整
    body: Vec<u8>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// 缓冲区必须包含完整的头部（以空行结尾）；空行之后的字节被视为请求体的开头。
    pub fn try_from(buffer: &[u8], id: u64) -> Result<Self, Exception> {
        let head_end = match find_header_end(buffer) {
            Some(end) => end,
            None if buffer.len() > MAX_HEADER_SIZE => return Err(Exception::HeaderTooLarge),
            None => {
                error!("[ID{}]HTTP请求头部不完整", id);
                return Err(Exception::MalformedRequest);
            }
        };
        if head_end > MAX_HEADER_SIZE {
            return Err(Exception::HeaderTooLarge);
        }

        let head = match std::str::from_utf8(&buffer[..head_end - HEADER_END.len()]) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or_default();
        let captures = match REQUEST_LINE.captures(request_line) {
            Some(c) => c,
            None => {
                error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
                return Err(Exception::MalformedRequest);
            }
        };

        let method_str = captures[1].to_uppercase();
        let method = match HttpRequestMethod::parse(&method_str) {
            Some(m) => m,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let uri = captures[2].to_string();
        if uri.len() > MAX_URI_LENGTH {
            error!("[ID{}]请求URI过长：{} 字节", id, uri.len());
            return Err(Exception::UriTooLong);
        }
        if !uri.starts_with('/') {
            error!("[ID{}]请求URI不是绝对路径：{}", id, uri);
            return Err(Exception::MalformedRequest);
        }

        let version_str = captures[3].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) if !name.trim().is_empty() => {
                    headers.insert(name.trim().to_lowercase(), value.trim().to_string());
                }
                _ => {
                    error!("[ID{}]无法解析的标头行：{}", id, line);
                    return Err(Exception::MalformedRequest);
                }
            }
        }

        Ok(Self {
            method,
            uri,
            version,
            headers,
            body: buffer[head_end..].to_vec(),
        })
    }
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 原始 URI（含查询字符串）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 去掉查询字符串之后的路径部分
    pub fn path(&self) -> &str {
        match self.uri.split_once('?') {
            Some((path, _)) => path,
            None => &self.uri,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, q)| q)
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// 按名称查询标头，大小写不敏感
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or_default()
    }

    /// 头部之后已经读到的请求体字节
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 解析 `Content-Length`；缺失时为 `None`
    pub fn content_length(&self) -> Result<Option<u64>, Exception> {
        match self.header("content-length") {
            Some(v) => v
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Exception::InvalidContentLength),
            None => Ok(None),
        }
    }
}
