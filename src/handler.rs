// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应生成器
//!
//! 把一个 [`ParsedRequest`] 变成完整的 [`Response`]：
//! 1. 上游已经判定失败（状态码 >= 400）时直接交给错误页解析器。
//! 2. 根据请求的 `Connection` 头决定 `keep-alive` 或 `close`。
//! 3. 路由配置了重定向时返回 301。
//! 4. 按方法分派到 GET / POST / DELETE 处理器，其他方法返回 501。
//!
//! 每个处理器只返回一个 [`Outcome`]，最终由 [`Response::finalize`] 一次性生成响应。

use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use log::{debug, error, warn};

use crate::{
    directory,
    param::{ConnectionMode, HttpRequestMethod},
    response::{Outcome, Response},
    router::ParsedRequest,
    util::{check_file_perms, file_content_length, get_mime, is_directory},
};

/// 单次请求内的状态码棘轮：乐观的 `Ok` 只能升级为错误码，不能从错误回到成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Failed(u16),
}

impl Status {
    /// 从上游预置的状态码得到初始状态。0 表示尚未判定，视为成功。
    pub fn from_preset(code: u16) -> Self {
        if code >= 400 {
            Status::Failed(code)
        } else {
            Status::Ok
        }
    }

    pub fn escalate(self, code: u16) -> Self {
        match self {
            Status::Ok if code >= 400 => Status::Failed(code),
            other => other,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// 生成响应的入口
pub fn generate(request: &mut ParsedRequest, id: u64) -> Response {
    let connection = ConnectionMode::from_header(request.header("Connection"));
    let status = Status::from_preset(request.status_code());

    let outcome = match status {
        Status::Failed(code) => {
            debug!("[ID{}]上游已判定状态码{}，直接生成错误页", id, code);
            Outcome::Error(code)
        }
        Status::Ok => match request.route().and_then(|r| r.redirect()) {
            Some(target) => Outcome::Redirect {
                location: target.to_string(),
            },
            None => dispatch(request, status, id),
        },
    };

    Response::finalize(outcome, connection, request.config(), id)
}

fn dispatch(request: &mut ParsedRequest, status: Status, id: u64) -> Outcome {
    match request.method() {
        HttpRequestMethod::Get => handle_get(request, id),
        HttpRequestMethod::Post => handle_post(status),
        HttpRequestMethod::Delete => handle_delete(request, status, id),
        other => {
            warn!("[ID{}]未实现的方法{}，返回501", id, other);
            Outcome::Error(501)
        }
    }
}

/// 在原始 URI 的路径部分末尾追加 `/`，查询字符串保持在后面
fn with_trailing_slash(uri: &str) -> String {
    match uri.split_once('?') {
        Some((path, query)) => format!("{}/?{}", path, query),
        None => format!("{}/", uri),
    }
}

fn handle_get(request: &mut ParsedRequest, id: u64) -> Outcome {
    let path = request.path().to_string();
    let code = check_file_perms(&path);

    if is_directory(&path) {
        if !path.ends_with('/') {
            return Outcome::Redirect {
                location: with_trailing_slash(request.original_uri()),
            };
        }

        let route = match request.route() {
            Some(r) => r,
            None => return Outcome::Error(404),
        };
        if !route.allows(HttpRequestMethod::Get) {
            return Outcome::Error(405);
        }

        let default_file = request.default_index();
        let path_to_index = format!("{}{}", path, default_file);
        // 与默认文件同名的子目录不能当作文件返回
        if !default_file.is_empty()
            && !is_directory(&path_to_index)
            && check_file_perms(&path_to_index) == 200
        {
            debug!("[ID{}]目录命中默认文件{}", id, path_to_index);
            request.set_path(path_to_index);
            return serve_file(request.path(), id);
        }

        if request.autoindex() {
            return directory::auto_index(&path, request.original_uri(), route.list_parent(), id);
        }
        return Outcome::Error(403);
    }

    match code {
        200 => serve_file(&path, id),
        _ => Outcome::Error(code),
    }
}

fn serve_file(path: &str, id: u64) -> Outcome {
    let content_type = get_mime(path);
    match file_content_length(path) {
        Ok(length) => Outcome::File {
            path: PathBuf::from(path),
            content_type,
            length,
        },
        Err(e) => {
            error!("[ID{}]无法获取文件{}的大小：{}", id, path, e);
            Outcome::Error(500)
        }
    }
}

/// 上传步骤已在上游完成；状态仍为成功即返回 201
fn handle_post(status: Status) -> Outcome {
    match status {
        Status::Ok => Outcome::Created,
        Status::Failed(code) => Outcome::Error(code),
    }
}

/// 按路径组件判断 `target` 是否位于 `upload_dir` 之内。
/// 上传目录为空、目标含有 `..` 组件时一律视为不在其内。
pub fn within_upload_dir(target: &str, upload_dir: &str) -> bool {
    if upload_dir.is_empty() {
        return false;
    }
    let target = Path::new(target);
    if target.components().any(|c| c == Component::ParentDir) {
        return false;
    }
    target.starts_with(Path::new(upload_dir))
}

/// 解析符号链接之后，目标所在目录仍须位于上传目录之内。
/// 任一侧无法解析时交给后续的删除操作报告（通常是 404）。
fn resolves_within_upload_dir(target: &str, upload_dir: &str) -> bool {
    let base = match fs::canonicalize(upload_dir) {
        Ok(b) => b,
        Err(_) => return true,
    };
    let parent = match Path::new(target).parent().map(fs::canonicalize) {
        Some(Ok(p)) => p,
        _ => return true,
    };
    parent.starts_with(base)
}

fn handle_delete(request: &ParsedRequest, status: Status, id: u64) -> Outcome {
    if let Status::Failed(code) = status {
        return Outcome::Error(code);
    }
    let path = request.path();

    // 先做包含检查，再碰文件系统
    if !within_upload_dir(path, request.upload_dir()) {
        warn!(
            "[ID{}]拒绝删除上传目录`{}`之外的路径{}",
            id,
            request.upload_dir(),
            path
        );
        return Outcome::Error(403);
    }
    if !resolves_within_upload_dir(path, request.upload_dir()) {
        warn!("[ID{}]路径{}经符号链接指向上传目录之外，拒绝删除", id, path);
        return Outcome::Error(403);
    }
    if is_directory(path) {
        warn!("[ID{}]拒绝删除目录{}", id, path);
        return Outcome::Error(403);
    }

    let status = match fs::remove_file(path) {
        Ok(()) => status,
        Err(e) if e.kind() == ErrorKind::NotFound => status.escalate(404),
        Err(e) => {
            error!("[ID{}]删除文件{}失败：{}", id, path, e);
            status.escalate(500)
        }
    };
    match status {
        Status::Ok => {
            debug!("[ID{}]已删除{}", id, path);
            Outcome::NoContent
        }
        Status::Failed(code) => Outcome::Error(code),
    }
}
