// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 网络层
//!
//! 基于 Tokio 的监听与连接处理：每个配置端口一个监听器，每个连接一个任务，
//! 每个连接只处理一个请求。核心只计算响应的元数据，文件正文在这里按
//! `Content-Length` 精确写出（缓存命中、整读后缓存或分块流式传输）。

use std::{
    io,
    path::Path,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::{
    fs::File as TokioFile,
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
    signal,
    time::timeout,
};

use crate::{
    cache::{FileCache, FileStamp},
    config::Config,
    exception::Exception,
    handler,
    param::{ConnectionMode, HttpRequestMethod, MAX_HEADER_SIZE},
    request::{find_header_end, Request},
    response::{Body, Response},
    router, upload,
};

/// 单次读操作的超时时间
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// 所有连接共享的服务器状态
pub struct ServerState {
    config: Config,
    cache: Mutex<FileCache>,
    next_id: AtomicU64,
    active_connection: AtomicUsize,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        let cache = FileCache::from_capacity(config.cache_size());
        Self {
            config,
            cache: Mutex::new(cache),
            next_id: AtomicU64::new(0),
            active_connection: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn active_connection(&self) -> usize {
        self.active_connection.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// 绑定所有端口并开始服务，直到收到 Ctrl-C
pub async fn run(config: Config) -> io::Result<()> {
    let state = Arc::new(ServerState::new(config));
    let host = state.config().host().to_string();

    let mut tasks = Vec::new();
    for &port in state.config().ports() {
        let listener = match TcpListener::bind((host.as_str(), port)).await {
            Ok(l) => l,
            Err(e) => {
                error!("无法绑定端口：{}:{}，错误：{}", host, port, e);
                return Err(e);
            }
        };
        info!("服务端将在{}:{}上监听Socket连接", host, port);
        tasks.push(tokio::spawn(serve(listener, Arc::clone(&state))));
    }

    signal::ctrl_c().await?;
    info!(
        "收到停机信号，正在退出...（当前活跃连接数：{}）",
        state.active_connection()
    );
    for task in tasks {
        task.abort();
    }
    Ok(())
}

/// 主事件循环：持续接收新连接并交给独立任务处理
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) {
    loop {
        let (mut stream, addr) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                error!("接受TCP连接时遇到错误：{}", e);
                continue;
            }
        };
        let id = state.next_id();
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.active_connection.fetch_add(1, Ordering::Relaxed);
            handle_connection(&mut stream, id, &state).await;
            state.active_connection.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

/// # 连接处理器
///
/// 读取并解析请求、路由、执行上传步骤、生成响应并写出。任何 I/O 错误都只结束当前连接。
pub async fn handle_connection<S>(stream: &mut S, id: u64, state: &ServerState)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let config = state.config();

    let buffer = match read_head(stream, id).await {
        Ok(Some(b)) => b,
        Ok(None) => return,
        Err(e) => {
            warn!("[ID{}]读取HTTP请求失败：{}", id, e);
            let response = Response::from_status(e.status_code(), ConnectionMode::Close, config, id);
            if let Err(e) = send(stream, &response, state, id).await {
                error!("[ID{}]发送响应失败：{}", id, e);
            }
            return;
        }
    };
    let start_time = Instant::now();

    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败：{}，返回{}", id, e, e.status_code());
            let response = Response::from_status(e.status_code(), ConnectionMode::Close, config, id);
            if let Err(e) = send(stream, &response, state, id).await {
                error!("[ID{}]发送响应失败：{}", id, e);
            }
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    let mut parsed = router::resolve(&request, config, id);
    debug!("[ID{}]HTTP路由解析完毕", id);

    if request.method() == HttpRequestMethod::Post && parsed.status_code() < 400 {
        let length = request.content_length().ok().flatten().unwrap_or(0);
        match read_body(stream, request.body(), length).await {
            Ok(body) => upload::store(&mut parsed, &body, id),
            Err(e) => {
                warn!("[ID{}]读取请求体失败：{}", id, e);
                parsed.reject(e.status_code());
            }
        }
    }

    let response = handler::generate(&mut parsed, id);
    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.uri(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    if let Err(e) = send(stream, &response, state, id).await {
        error!("[ID{}]发送响应失败：{}", id, e);
    }
}

/// 读取到头部结束为止，头部超过上限或读超时都按对应状态码处理。
/// 客户端未发送任何数据就关闭连接时返回 `None`。
async fn read_head<S>(stream: &mut S, id: u64) -> Result<Option<Vec<u8>>, Exception>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = match timeout(READ_TIMEOUT, stream.read(&mut chunk)).await {
            Err(_) => return Err(Exception::RequestTimeout),
            Ok(Err(e)) => {
                error!("[ID{}]读取TCPStream时遇到错误：{}", id, e);
                return Ok(None);
            }
            Ok(Ok(0)) if buffer.is_empty() => return Ok(None),
            Ok(Ok(0)) => return Err(Exception::MalformedRequest),
            Ok(Ok(n)) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);
        if find_header_end(&buffer).is_some() {
            return Ok(Some(buffer));
        }
        if buffer.len() > MAX_HEADER_SIZE {
            return Err(Exception::HeaderTooLarge);
        }
    }
}

/// 读取恰好 `length` 字节的请求体，`prefix` 是与头部一同读到的部分
async fn read_body<S>(stream: &mut S, prefix: &[u8], length: u64) -> Result<Vec<u8>, Exception>
where
    S: AsyncRead + Unpin,
{
    let length = usize::try_from(length).map_err(|_| Exception::InvalidContentLength)?;
    let mut body = prefix[..prefix.len().min(length)].to_vec();
    let have = body.len();
    body.resize(length, 0);
    if have < length {
        match timeout(READ_TIMEOUT, stream.read_exact(&mut body[have..])).await {
            Err(_) => return Err(Exception::RequestTimeout),
            Ok(Err(_)) => return Err(Exception::MalformedRequest),
            Ok(Ok(_)) => {}
        }
    }
    Ok(body)
}

/// 写出头部与正文，随后关闭写端
async fn send<S>(stream: &mut S, response: &Response, state: &ServerState, id: u64) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&response.header_bytes()).await?;
    match response.body() {
        Body::Empty => {}
        Body::Bytes(b) => stream.write_all(b).await?,
        Body::File(path) => {
            let length = response.content_length().unwrap_or(0);
            write_file_body(stream, path, length, state, id).await?;
        }
    }
    stream.flush().await?;
    stream.shutdown().await
}

async fn write_limited<S>(stream: &mut S, bytes: &Bytes, length: u64) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let end = usize::try_from(length).unwrap_or(usize::MAX).min(bytes.len());
    stream.write_all(&bytes[..end]).await
}

/// 写出文件正文，总字节数不超过已经发送的 `Content-Length`
async fn write_file_body<S>(
    stream: &mut S,
    path: &Path,
    length: u64,
    state: &ServerState,
    id: u64,
) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let metadata = tokio::fs::metadata(path).await?;
    let stamp = FileStamp::of(&metadata);
    if stamp.size() != length {
        warn!(
            "[ID{}]文件{:?}在生成响应后发生变化：{} -> {} bytes",
            id,
            path,
            length,
            stamp.size()
        );
    }

    let cached = match state.cache.lock() {
        Ok(mut cache) => cache.find(path, stamp),
        Err(_) => {
            error!("[ID{}]缓存锁已被污染，跳过缓存", id);
            None
        }
    };
    if let Some(bytes) = cached {
        debug!("[ID{}]缓存命中：{:?}", id, path);
        return write_limited(stream, &bytes, length).await;
    }

    if FileCache::should_cache(stamp.size(), state.config().cache_threshold()) {
        let bytes = Bytes::from(tokio::fs::read(path).await?);
        if bytes.len() as u64 == stamp.size() {
            if let Ok(mut cache) = state.cache.lock() {
                cache.push(path, bytes.clone(), stamp);
                debug!("[ID{}]文件{:?}已加入缓存", id, path);
            }
        }
        return write_limited(stream, &bytes, length).await;
    }

    debug!("[ID{}]使用流式传输模式发送大文件，文件大小: {} bytes", id, length);
    let file = TokioFile::open(path).await?;
    let mut reader = file.take(length);
    let mut buffer = vec![0u8; state.config().chunk_size().max(1)];
    let mut total_sent = 0u64;
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&buffer[..n]).await?;
        total_sent += n as u64;
    }
    if total_sent < length {
        warn!("[ID{}]文件正文不足：应发送{}字节，实际{}字节", id, length, total_sent);
    }
    debug!("[ID{}]流式传输完成，共发送 {} 字节", id, total_sent);
    Ok(())
}
