// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{
    config::Config,
    error_page,
    param::*,
    util::format_date,
};

use bytes::Bytes;
use chrono::prelude::*;
use log::debug;

use std::path::{Path, PathBuf};

/// 各个方法处理器的结果。处理器只返回结果，不直接修改响应；
/// 由 [`Response::finalize`] 统一转换成最终响应。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 静态文件：元数据由核心计算，正文由 I/O 层按 `length` 读取
    File {
        path: PathBuf,
        content_type: &'static str,
        length: u64,
    },
    /// 内存中生成的 200 页面（目录索引）
    Page {
        content_type: &'static str,
        body: Bytes,
    },
    Redirect { location: String },
    Created,
    NoContent,
    /// 交给错误页解析器渲染
    Error(u16),
}

/// 响应正文的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Bytes(Bytes),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: &'static str,
    content_type: Option<String>,
    content_length: Option<u64>,
    date: DateTime<Utc>,
    location: Option<String>,
    server_name: &'static str,
    connection: ConnectionMode,
    body: Body,
}

impl Response {
    fn new(connection: ConnectionMode) -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK",
            content_type: None,
            content_length: None,
            date: Utc::now(),
            location: None,
            server_name: SERVER_NAME,
            connection,
            body: Body::Empty,
        }
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = reason_phrase(code);
        self
    }

    fn set_body(&mut self, content_type: &str, body: Bytes) -> &mut Self {
        self.content_type = Some(content_type.to_string());
        self.content_length = Some(body.len() as u64);
        self.body = Body::Bytes(body);
        self
    }

    /// # 终结步骤
    ///
    /// 把处理结果转换成完整响应。状态码与正文都在这里一次性确定，
    /// 头部随后从最终状态码和最终正文长度计算得出。
    pub fn finalize(outcome: Outcome, connection: ConnectionMode, config: &Config, id: u64) -> Self {
        let mut response = Self::new(connection);
        match outcome {
            Outcome::File {
                path,
                content_type,
                length,
            } => {
                debug!("[ID{}]静态文件{:?}，{}，{} bytes", id, path, content_type, length);
                response.set_code(200);
                response.content_type = Some(content_type.to_string());
                response.content_length = Some(length);
                response.body = Body::File(path);
            }
            Outcome::Page { content_type, body } => {
                response.set_code(200).set_body(content_type, body);
            }
            Outcome::Redirect { location } => {
                debug!("[ID{}]重定向到{}", id, location);
                response.set_code(301);
                response.content_length = Some(0);
                response.location = Some(location);
            }
            Outcome::Created => {
                response.set_code(201);
            }
            Outcome::NoContent => {
                response.set_code(204);
            }
            Outcome::Error(code) => {
                let page = error_page::resolve(code, config.error_pages(), id);
                response.set_code(page.code).set_body(page.content_type, page.body);
            }
        }
        response
    }

    /// 直接渲染某个错误状态码，用于尚未完成路由就失败的请求
    pub fn from_status(code: u16, connection: ConnectionMode, config: &Config, id: u64) -> Self {
        Self::finalize(Outcome::Error(code), connection, config, id)
    }

    /// 按固定顺序拼接状态行与头部：状态行、Date、Content-Type、Content-Length、
    /// Location、Server、Connection，最后是空行。
    pub fn header_bytes(&self) -> Vec<u8> {
        let version: &str = &self.version.to_string();
        let status_code: &str = &self.status_code.to_string();
        let date: &str = &format_date(&self.date);
        let mut header = [
            version,
            " ",
            status_code,
            " ",
            self.information,
            CRLF,
            "Date: ",
            date,
            CRLF,
        ]
        .concat();
        if let Some(t) = &self.content_type {
            header.push_str(&["Content-Type: ", t, CRLF].concat());
        }
        if let Some(l) = self.content_length {
            header.push_str(&["Content-Length: ", &l.to_string(), CRLF].concat());
        }
        if let Some(l) = &self.location {
            header.push_str(&["Location: ", l, CRLF].concat());
        }
        header.push_str(&["Server: ", self.server_name, CRLF].concat());
        header.push_str(&["Connection: ", &self.connection.to_string(), CRLF].concat());
        header.push_str(CRLF);
        header.into_bytes()
    }

    /// 头部加上内存中的正文。文件正文不在此处读取，由 I/O 层按 `Content-Length` 写出。
    pub fn as_bytes(&self) -> Vec<u8> {
        let header = self.header_bytes();
        match &self.body {
            Body::Bytes(b) => [header.as_slice(), &b[..]].concat(),
            _ => header,
        }
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        self.information
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// 需要由 I/O 层从磁盘写出的文件正文
    pub fn file_body(&self) -> Option<&Path> {
        match &self.body {
            Body::File(p) => Some(p),
            _ => None,
        }
    }
}
