// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由引擎
//!
//! 把词法解析后的 [`Request`] 与配置中的路由表结合，得到响应生成所需的 [`ParsedRequest`]：
//! 匹配路由（最长前缀）、把 URI 映射到文件系统路径，并提前判定方法许可、请求体大小等
//! 上游校验。校验失败不会中断流程，而是把状态码预置到 `ParsedRequest` 上交给响应生成器。

use std::collections::HashMap;

use log::{debug, warn};

use crate::{
    config::{Config, Route},
    param::HttpRequestMethod,
    request::Request,
};

/// 一次请求在进入响应生成器时的完整上下文。
///
/// 除了解析后的路径（目录默认文件改写）和状态码（只会向错误方向推进）之外，其余字段都不可变。
#[derive(Debug, Clone)]
pub struct ParsedRequest<'a> {
    method: HttpRequestMethod,
    original_uri: String,
    path: String,
    headers: HashMap<String, String>,
    status_code: u16,
    route: Option<&'a Route>,
    config: &'a Config,
}

impl<'a> ParsedRequest<'a> {
    pub fn new(
        config: &'a Config,
        route: Option<&'a Route>,
        method: HttpRequestMethod,
        original_uri: &str,
        path: &str,
    ) -> Self {
        Self {
            method,
            original_uri: original_uri.to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            status_code: 200,
            route,
            config,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    /// 把状态码推进到错误码。已经处于错误状态时保留第一个错误。
    pub fn reject(&mut self, code: u16) {
        if self.status_code < 400 && code >= 400 {
            self.status_code = code;
        }
    }

    /// 目录默认文件命中时改写解析后的路径
    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

impl<'a> ParsedRequest<'a> {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn original_uri(&self) -> &str {
        &self.original_uri
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn route(&self) -> Option<&'a Route> {
        self.route
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn upload_dir(&self) -> &'a str {
        self.route.map(|r| r.upload_dir()).unwrap_or_default()
    }

    pub fn default_index(&self) -> &'a str {
        self.route.map(|r| r.default_file()).unwrap_or_default()
    }

    pub fn autoindex(&self) -> bool {
        self.route.map(|r| r.dir_listing()).unwrap_or(false)
    }
}

/// 最长前缀匹配。前缀命中要求路径与之相等，或者前缀以 `/` 结尾，或者紧随其后的字符是 `/`。
pub fn match_route<'a>(config: &'a Config, path: &str) -> Option<(&'a str, &'a Route)> {
    config
        .routes()
        .iter()
        .filter(|(prefix, _)| {
            path == prefix.as_str()
                || (path.starts_with(prefix.as_str())
                    && (prefix.ends_with('/') || path[prefix.len()..].starts_with('/')))
        })
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(prefix, route)| (prefix.as_str(), route))
}

/// 把 URI 路径映射到路由根目录下。路径末尾的 `/` 会被保留，目录重定向依赖它。
pub fn resolve_path(prefix: &str, root: &str, path: &str) -> String {
    let rest = path[prefix.len().min(path.len())..].trim_start_matches('/');
    let mut resolved = root.trim_end_matches('/').to_string();
    if resolved.is_empty() && root.starts_with('/') {
        resolved.push('/');
        resolved.push_str(rest);
        return resolved;
    }
    if !rest.is_empty() || path.ends_with('/') {
        resolved.push('/');
        resolved.push_str(rest);
    }
    resolved
}

/// `%XX` 解码；非法转义或解码结果不是 UTF-8 时返回 `None`
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            // from_str_radix 会接受前导 `+`，这里要求两位都是十六进制数字
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// # 路由解析
///
/// 依次执行：URI 解码与越权检查 -> 路由匹配 -> 方法许可 -> 请求体大小。
/// 每一步失败都只是预置状态码，后续步骤不会覆盖更早的错误。
pub fn resolve<'a>(request: &Request, config: &'a Config, id: u64) -> ParsedRequest<'a> {
    let method = request.method();
    let decoded = percent_decode(request.path());

    let (route_match, path) = match &decoded {
        Some(p) if !has_parent_segment(p) => match match_route(config, p) {
            Some((prefix, route)) => {
                let resolved = resolve_path(prefix, route.root(), p);
                debug!("[ID{}]路由 `{}` 命中，映射物理路径：{}", id, prefix, resolved);
                (Some(route), resolved)
            }
            None => (None, String::new()),
        },
        _ => (None, String::new()),
    };

    let mut parsed = ParsedRequest::new(config, route_match, method, request.uri(), &path);
    parsed.headers = request.headers().clone();

    match &decoded {
        None => {
            warn!("[ID{}]请求的路径：{} 包含非法转义，返回400", id, request.uri());
            parsed.reject(400);
        }
        Some(p) if has_parent_segment(p) => {
            warn!("[ID{}]请求的路径：{} 包含上级目录引用，返回400", id, request.uri());
            parsed.reject(400);
        }
        _ => {}
    }

    let route = match route_match {
        Some(r) => r,
        None => {
            if parsed.status_code() < 400 {
                warn!("[ID{}]请求的路径：{} 没有匹配的路由，返回404", id, request.uri());
            }
            parsed.reject(404);
            return parsed;
        }
    };

    if !route.allows(method) {
        warn!("[ID{}]路由不允许 {} 方法，返回405", id, method);
        parsed.reject(405);
    }

    match request.content_length() {
        Ok(Some(length)) if length > route.max_body_size(config) => {
            warn!(
                "[ID{}]请求体 {} 字节超过上限 {} 字节，返回413",
                id,
                length,
                route.max_body_size(config)
            );
            parsed.reject(413);
        }
        Ok(_) => {}
        Err(e) => {
            warn!("[ID{}]{}，返回400", id, e);
            parsed.reject(400);
        }
    }

    parsed
}
