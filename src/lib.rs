// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod cache;
pub mod config;
pub mod directory;
pub mod error_page;
pub mod exception;
pub mod handler;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod upload;
pub mod util;

pub use cache::FileCache;
pub use config::{Config, Route};
pub use exception::Exception;
pub use param::{ConnectionMode, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::{Outcome, Response};
pub use router::ParsedRequest;
pub use util::HtmlBuilder;
