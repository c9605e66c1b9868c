// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::{fs, path::Path};

use bytes::Bytes;
use log::{debug, error};

use crate::{
    response::Outcome,
    util::{HtmlBuilder, IndexEntry},
};

/// 自动生成目录索引页。读取目录失败时返回 500，由错误页解析器渲染。
pub fn auto_index(path: &str, original_uri: &str, list_parent: bool, id: u64) -> Outcome {
    let entries = match fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            error!("[ID{}]无法读取目录{}：{}", id, path, e);
            return Outcome::Error(500);
        }
    };

    let mut dir_vec = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        // 跟随符号链接，与直接访问该条目时的行为一致
        let metadata = match fs::metadata(Path::new(path).join(&name)) {
            Ok(m) => m,
            Err(_) => continue,
        };
        dir_vec.push(IndexEntry {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    debug!("[ID{}]目录{}共有{}个条目", id, path, dir_vec.len());

    let html = HtmlBuilder::from_dir(original_uri, &mut dir_vec, list_parent).build();
    Outcome::Page {
        content_type: "text/html",
        body: Bytes::from(html),
    }
}
