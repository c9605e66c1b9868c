// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义请求解析与配置加载过程中可能出现的异常。
//!
//! 请求阶段的异常都带有对应的 HTTP 状态码（见 [`Exception::status_code`]），
//! 上层不会直接把它们写回客户端，而是交给错误页解析器生成完整响应。
//! 文件系统相关的失败不在此列：它们在响应生成内部被映射为状态码，不以 `Err` 形式传播。

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头部无法解析为合法的 UTF-8 字符串
    RequestIsNotUtf8,
    /// 请求行或某个标头行格式不正确
    MalformedRequest,
    /// 请求方法不在可识别的列表中
    UnSupportedRequestMethod,
    /// 不支持的 HTTP 协议版本（例如 HTTP/2.0）
    UnsupportedHttpVersion,
    /// 请求 URI 超出长度上限
    UriTooLong,
    /// 请求头部超出长度上限
    HeaderTooLarge,
    /// `Content-Length` 不是合法的非负整数
    InvalidContentLength,
    /// 客户端在超时时间内没有发送完整请求
    RequestTimeout,
    /// 配置文件无法读取
    ConfigUnreadable(String),
    /// 配置文件内容不合法
    ConfigInvalid(String),
}

use Exception::*;

impl Exception {
    /// 请求阶段异常对应的响应状态码。配置异常不会出现在请求路径上，统一视为 500。
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | MalformedRequest | HeaderTooLarge | InvalidContentLength => 400,
            UnSupportedRequestMethod => 501,
            UnsupportedHttpVersion => 505,
            UriTooLong => 414,
            RequestTimeout => 408,
            ConfigUnreadable(_) | ConfigInvalid(_) => 500,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request head can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed request line or header"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            UriTooLong => write!(f, "Request URI too long"),
            HeaderTooLarge => write!(f, "Request header too large"),
            InvalidContentLength => write!(f, "Invalid Content-Length"),
            RequestTimeout => write!(f, "Request timed out"),
            ConfigUnreadable(msg) => write!(f, "Couldn't read config file: {}", msg),
            ConfigInvalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MalformedRequest.status_code(), 400);
        assert_eq!(UnSupportedRequestMethod.status_code(), 501);
        assert_eq!(UnsupportedHttpVersion.status_code(), 505);
        assert_eq!(UriTooLong.status_code(), 414);
        assert_eq!(RequestTimeout.status_code(), 408);
    }

    #[test]
    fn test_display_carries_detail() {
        let e = ConfigInvalid("route `x` must start with '/'".to_string());
        assert!(e.to_string().contains("route `x`"));
    }
}
