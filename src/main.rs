// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # EnginX
//!
//! 配置驱动的静态 Web 服务器：
//! - 按路由前缀把请求映射到文件系统
//! - 目录默认文件、自动索引与 301 补全斜杠
//! - 上传目录内的 POST 存储与 DELETE 删除
//! - 自定义或自动生成的错误页
//! - 基于 LRU 的文件缓存与大文件分块传输

use enginx::{config::Config, server};

use log::{error, info};
use tokio::runtime::Builder;

use std::{env, process};

const DEFAULT_CONFIG: &str = "config/development.toml";
const LOG_CONFIG: &str = "config/log4rs.yaml";

fn main() {
    // 日志初始化失败不影响服务器运行
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法从{}初始化日志系统：{}", LOG_CONFIG, e);
    }

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match Config::from_toml(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("配置文件{}载入失败：{}", config_path, e);
            eprintln!("配置文件{}载入失败：{}", config_path, e);
            process::exit(1);
        }
    };
    info!("配置文件已载入：{}", config_path);
    info!(
        "路由数量：{}，工作线程数：{}，缓存容量：{}",
        config.routes().len(),
        config.worker_threads(),
        config.cache_size()
    );

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads().max(1))
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(server::run(config)) {
        error!("服务器异常退出：{}", e);
        process::exit(1);
    }
    info!("服务器已停止");
}
