// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{fs, path::Path};

use chrono::Utc;
use log::{debug, error, warn};

use crate::{router::ParsedRequest, util::is_directory};

/// URI 指向目录时生成的文件名，例如 `upload-20260101T120000.123456Z`
fn generated_name() -> String {
    format!("upload-{}", Utc::now().format("%Y%m%dT%H%M%S%.6fZ"))
}

/// 上传后的存放位置：上传目录 + URI 最后一段的文件名
pub fn target_path(path: &str, upload_dir: &str) -> String {
    let name = match Path::new(path).file_name().and_then(|n| n.to_str()) {
        Some(n) if !path.ends_with('/') && !is_directory(path) => n.to_string(),
        _ => generated_name(),
    };
    Path::new(upload_dir).join(name).to_string_lossy().to_string()
}

/// # 保存上传的请求体
///
/// 只在上游校验全部通过时执行。路由没有配置上传目录时返回 403，写入失败时返回 500；
/// 两种情况都只推进请求的状态码，由响应生成器负责渲染。
pub fn store(request: &mut ParsedRequest, body: &[u8], id: u64) {
    if request.status_code() >= 400 {
        return;
    }
    let upload_dir = request.upload_dir();
    if upload_dir.is_empty() {
        warn!("[ID{}]路由没有配置上传目录，拒绝POST，返回403", id);
        request.reject(403);
        return;
    }

    let target = target_path(request.path(), upload_dir);
    match fs::write(&target, body) {
        Ok(()) => debug!("[ID{}]已保存上传文件{}，{} bytes", id, target, body.len()),
        Err(e) => {
            error!("[ID{}]写入上传文件{}失败：{}", id, target, e);
            request.reject(500);
        }
    }
}
