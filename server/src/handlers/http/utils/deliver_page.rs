use std::convert::Infallible;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full, combinators::BoxBody};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use tracing::debug;

use crate::HttpResponse;
use crate::handlers::http::utils::headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    Long,  // 1 year, fingerprinted assets under /static
    Short, // 1 hour
    Never, // pages; always revalidated
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStrategy::Long => write!(f, "long (1 year)"),
            CacheStrategy::Short => write!(f, "short (1 hour)"),
            CacheStrategy::Never => write!(f, "never"),
        }
    }
}

/// Read a file from disk and deliver it with MIME type and caching headers.
pub async fn deliver_file<P: AsRef<Path>>(
    file_path: P,
    status: StatusCode,
    cache: CacheStrategy,
) -> Result<HttpResponse> {
    let file_path = file_path.as_ref();

    debug!(
        "Reading static file from: {} (cache: {})",
        file_path.display(),
        cache
    );

    let content = tokio::fs::read(file_path)
        .await
        .with_context(|| format!("Failed to read static file: {}", file_path.display()))?;

    let mime_type = get_mime_type(file_path);

    debug!(
        "Delivering static file with status: {}, size: {} bytes, mime: {}",
        status,
        content.len(),
        mime_type
    );

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime_type)
        .body(full(content))
        .map_err(|e| anyhow!("Failed to build response: {}", e))?;

    Ok(match cache {
        CacheStrategy::Long => headers::add_cache_headers_with_max_age(response, None),
        CacheStrategy::Short => headers::add_cache_headers_with_max_age(response, Some(3600)),
        CacheStrategy::Never => headers::add_no_cache_headers(response),
    })
}

/// Files that may answer a GET for `request_path`, in priority order.
///
/// `/` is `index.html`; `/static/..` maps straight onto the web dir; any
/// other page `P` is `P.html` then `P/index.html`.  Paths that try to leave
/// `web_dir` produce no candidates.
pub fn page_candidates(web_dir: &Path, request_path: &str) -> Vec<(PathBuf, CacheStrategy)> {
    let relative = request_path.trim_start_matches('/').trim_end_matches('/');

    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
        || relative.contains('\\');
    if escapes {
        return Vec::new();
    }

    if relative.is_empty() {
        return vec![(web_dir.join("index.html"), CacheStrategy::Never)];
    }

    if request_path.starts_with("/static/") {
        return vec![(web_dir.join(relative), CacheStrategy::Long)];
    }

    if Path::new(relative).extension().is_some() {
        return vec![(web_dir.join(relative), CacheStrategy::Short)];
    }

    vec![
        (web_dir.join(format!("{}.html", relative)), CacheStrategy::Never),
        (web_dir.join(relative).join("index.html"), CacheStrategy::Never),
    ]
}

/// Helper function to determine MIME type from file extension
fn get_mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()) {
        // Web documents
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("map") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",

        // Images
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        Some("pdf") => "application/pdf",

        _ => "application/octet-stream",
    }
}

/// `302 Found` to a fixed location.
pub fn redirect(location: &'static str) -> HttpResponse {
    debug!("Delivering redirect to: {}", location);

    let mut response = Response::new(empty());
    *response.status_mut() = StatusCode::FOUND;
    response
        .headers_mut()
        .insert(header::LOCATION, HeaderValue::from_static(location));
    response
}

/// Helper function to create an empty body
pub fn empty() -> BoxBody<Bytes, Infallible> {
    Empty::<Bytes>::new().boxed()
}

/// Helper function to create a full body from various types
pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}
