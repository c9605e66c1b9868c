// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use num_cpus;
use serde::{de::Deserialize as _, Deserializer};
use serde_derive::Deserialize;

use log::warn;
use std::{collections::HashMap, fs, str::FromStr};

use crate::{
    exception::Exception,
    param::{HttpRequestMethod, STATUS_CODES},
};

/// 服务器配置。进程启动时加载一次，之后只读，由所有连接共享。
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_ports")]
    ports: Vec<u16>,
    #[serde(default)]
    server_names: Vec<String>,
    #[serde(default = "default_allowed_methods")]
    allowed_methods: Vec<HttpRequestMethod>,
    #[serde(default = "default_max_body_size")]
    max_body_size: u64,
    #[serde(default, deserialize_with = "deserialize_error_pages")]
    error_pages: HashMap<u16, String>,
    #[serde(default)]
    routes: HashMap<String, Route>,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_cache_size")]
    cache_size: usize,
    #[serde(default = "default_cache_threshold")]
    cache_threshold: u64,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
}

/// 一条路由：URL 前缀对应的文件系统根以及方法、行为规则。
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Route {
    #[serde(default)]
    root: String,
    /// 未配置时在加载阶段继承服务器级默认值
    #[serde(default)]
    allowed_methods: Option<Vec<HttpRequestMethod>>,
    #[serde(default)]
    redirect: Option<String>,
    #[serde(default)]
    default_file: String,
    #[serde(default)]
    dir_listing: bool,
    #[serde(default = "default_list_parent")]
    list_parent: bool,
    #[serde(default)]
    max_body_size: Option<u64>,
    #[serde(default)]
    cgi_extensions: Vec<String>,
    #[serde(default)]
    upload_dir: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ports() -> Vec<u16> {
    vec![8080]
}

fn default_allowed_methods() -> Vec<HttpRequestMethod> {
    vec![HttpRequestMethod::Get]
}

fn default_max_body_size() -> u64 {
    1048576 // 1MB
}

fn default_cache_size() -> usize {
    32
}

fn default_cache_threshold() -> u64 {
    1048576 // 1MB
}

fn default_chunk_size() -> usize {
    262144 // 256KB
}

fn default_list_parent() -> bool {
    true
}

/// TOML 表的键总是字符串，这里把 `"404" = "..."` 转成数值键
fn deserialize_error_pages<'de, D>(deserializer: D) -> Result<HashMap<u16, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(code, path)| {
            code.trim()
                .parse::<u16>()
                .map(|c| (c, path))
                .map_err(|_| serde::de::Error::custom(format!("非法的错误页状态码：{}", code)))
        })
        .collect()
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            ports: default_ports(),
            server_names: Vec::new(),
            allowed_methods: default_allowed_methods(),
            max_body_size: default_max_body_size(),
            error_pages: HashMap::new(),
            routes: HashMap::new(),
            worker_threads: 0,
            cache_size: default_cache_size(),
            cache_threshold: default_cache_threshold(),
            chunk_size: default_chunk_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let str_val = fs::read_to_string(filename)
            .map_err(|e| Exception::ConfigUnreadable(format!("{}: {}", filename, e)))?;
        str_val.parse()
    }

    /// 追加一条路由。未显式设置方法的路由继承服务器默认方法。
    pub fn with_route(mut self, prefix: &str, mut route: Route) -> Self {
        if route.allowed_methods.is_none() {
            route.allowed_methods = Some(self.allowed_methods.clone());
        }
        self.routes.insert(prefix.to_string(), route);
        self
    }

    pub fn with_error_page(mut self, code: u16, path: &str) -> Self {
        self.error_pages.insert(code, path.to_string());
        self
    }

    pub fn with_max_body_size(mut self, size: u64) -> Self {
        self.max_body_size = size;
        self
    }

    fn validate(&self) -> Result<(), Exception> {
        if self.ports.is_empty() {
            return Err(Exception::ConfigInvalid("至少需要配置一个端口".to_string()));
        }
        for code in self.error_pages.keys() {
            if !STATUS_CODES.contains_key(code) {
                return Err(Exception::ConfigInvalid(format!(
                    "error_pages 中的状态码 {} 不是受支持的 HTTP 状态码",
                    code
                )));
            }
        }
        for (prefix, route) in &self.routes {
            if !prefix.starts_with('/') {
                return Err(Exception::ConfigInvalid(format!(
                    "路由前缀 `{}` 必须以 '/' 开头",
                    prefix
                )));
            }
            if route.redirect.is_none() && route.root.is_empty() {
                return Err(Exception::ConfigInvalid(format!(
                    "路由 `{}` 既没有 root 也没有 redirect",
                    prefix
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Exception;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw_config: Config =
            toml::from_str(s).map_err(|e| Exception::ConfigInvalid(e.to_string()))?;
        raw_config.validate()?;

        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.cache_size == 0 {
            warn!("cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为5。");
            raw_config.cache_size = 5;
        }
        let defaults = raw_config.allowed_methods.clone();
        for route in raw_config.routes.values_mut() {
            if route.allowed_methods.is_none() {
                route.allowed_methods = Some(defaults.clone());
            }
        }
        Ok(raw_config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn server_names(&self) -> &[String] {
        &self.server_names
    }

    pub fn allowed_methods(&self) -> &[HttpRequestMethod] {
        &self.allowed_methods
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    pub fn error_pages(&self) -> &HashMap<u16, String> {
        &self.error_pages
    }

    pub fn routes(&self) -> &HashMap<String, Route> {
        &self.routes
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn cache_threshold(&self) -> u64 {
        self.cache_threshold
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Route {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            list_parent: true,
            ..Default::default()
        }
    }

    pub fn with_methods(mut self, methods: &[HttpRequestMethod]) -> Self {
        self.allowed_methods = Some(methods.to_vec());
        self
    }

    pub fn with_redirect(mut self, target: &str) -> Self {
        self.redirect = Some(target.to_string());
        self
    }

    pub fn with_default_file(mut self, file: &str) -> Self {
        self.default_file = file.to_string();
        self
    }

    pub fn with_dir_listing(mut self, enabled: bool) -> Self {
        self.dir_listing = enabled;
        self
    }

    pub fn with_list_parent(mut self, enabled: bool) -> Self {
        self.list_parent = enabled;
        self
    }

    pub fn with_max_body_size(mut self, size: u64) -> Self {
        self.max_body_size = Some(size);
        self
    }

    pub fn with_upload_dir(mut self, dir: &str) -> Self {
        self.upload_dir = dir.to_string();
        self
    }
}

impl Route {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn allowed_methods(&self) -> &[HttpRequestMethod] {
        self.allowed_methods.as_deref().unwrap_or(&[])
    }

    pub fn allows(&self, method: HttpRequestMethod) -> bool {
        self.allowed_methods().contains(&method)
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn default_file(&self) -> &str {
        &self.default_file
    }

    pub fn dir_listing(&self) -> bool {
        self.dir_listing
    }

    pub fn list_parent(&self) -> bool {
        self.list_parent
    }

    /// 路由自身的上限优先，未设置时使用服务器默认值
    pub fn max_body_size(&self, config: &Config) -> u64 {
        self.max_body_size.unwrap_or(config.max_body_size)
    }

    pub fn cgi_extensions(&self) -> &[String] {
        &self.cgi_extensions
    }

    pub fn upload_dir(&self) -> &str {
        &self.upload_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
host = "0.0.0.0"
ports = [8080, 8081]
server_names = ["example.com", "www.example.com"]
allowed_methods = ["GET", "POST"]
max_body_size = 2048

[error_pages]
404 = "www/errors/404.html"
"500" = "www/errors/500.html"

[routes."/"]
root = "www"
default_file = "index.html"
dir_listing = true

[routes."/uploads"]
root = "www/uploads"
allowed_methods = ["GET", "POST", "DELETE"]
upload_dir = "www/uploads"
max_body_size = 10485760
cgi_extensions = [".py"]

[routes."/old"]
redirect = "/new/"
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = SAMPLE.parse().unwrap();
        assert_eq!(config.host(), "0.0.0.0");
        assert_eq!(config.ports(), &[8080, 8081]);
        assert_eq!(config.server_names().len(), 2);
        assert_eq!(config.max_body_size(), 2048);
        assert_eq!(config.error_pages().get(&404).unwrap(), "www/errors/404.html");
        assert_eq!(config.error_pages().get(&500).unwrap(), "www/errors/500.html");
        assert_eq!(config.routes().len(), 3);
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_route_inherits_default_methods() {
        let config: Config = SAMPLE.parse().unwrap();
        let root = config.routes().get("/").unwrap();
        assert!(root.allows(HttpRequestMethod::Get));
        assert!(root.allows(HttpRequestMethod::Post));
        assert!(!root.allows(HttpRequestMethod::Delete));

        let uploads = config.routes().get("/uploads").unwrap();
        assert!(uploads.allows(HttpRequestMethod::Delete));
    }

    #[test]
    fn test_route_max_body_size_override() {
        let config: Config = SAMPLE.parse().unwrap();
        assert_eq!(config.routes()["/"].max_body_size(&config), 2048);
        assert_eq!(config.routes()["/uploads"].max_body_size(&config), 10485760);
        assert_eq!(config.routes()["/uploads"].cgi_extensions(), &[".py".to_string()]);
    }

    #[test]
    fn test_route_defaults() {
        let config: Config = SAMPLE.parse().unwrap();
        let old = &config.routes()["/old"];
        assert_eq!(old.redirect(), Some("/new/"));
        assert!(!old.dir_listing());
        assert!(old.list_parent());
        assert_eq!(old.upload_dir(), "");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.ports(), &[8080]);
        assert_eq!(config.allowed_methods(), &[HttpRequestMethod::Get]);
        assert_eq!(config.max_body_size(), 1048576);
    }

    #[test]
    fn test_reject_unknown_error_page_code() {
        let result: Result<Config, _> = "[error_pages]\n999 = \"x.html\"\n".parse();
        assert!(matches!(result, Err(Exception::ConfigInvalid(_))));
    }

    #[test]
    fn test_reject_non_numeric_error_page_code() {
        let result: Result<Config, _> = "[error_pages]\nabc = \"x.html\"\n".parse();
        assert!(matches!(result, Err(Exception::ConfigInvalid(_))));
    }

    #[test]
    fn test_reject_prefix_without_slash() {
        let result: Result<Config, _> = "[routes.static]\nroot = \"www\"\n".parse();
        assert!(matches!(result, Err(Exception::ConfigInvalid(_))));
    }

    #[test]
    fn test_reject_route_without_root() {
        let result: Result<Config, _> = "[routes.\"/a\"]\ndir_listing = true\n".parse();
        assert!(matches!(result, Err(Exception::ConfigInvalid(_))));
    }

    #[test]
    fn test_reject_unknown_method() {
        let result: Result<Config, _> = "allowed_methods = [\"BREW\"]\n".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_toml("does/not/exist.toml");
        assert!(matches!(result, Err(Exception::ConfigUnreadable(_))));
    }

    #[test]
    fn test_builder_with_route() {
        let config = Config::new().with_route("/", Route::new("/var/www"));
        assert!(config.routes()["/"].allows(HttpRequestMethod::Get));
        assert!(!config.routes()["/"].allows(HttpRequestMethod::Delete));
    }
}
