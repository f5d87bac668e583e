//! Development HTTP server with live reload via Server-Sent Events.
//!
//! Serves the bootstrap page, runtime glue and compiled artefact from
//! memory, assets from their source location and anything else from the
//! output directory. `/_notify` streams reload and error messages to the
//! browser.

use crate::dev::broadcast::{ClientChannel, ClientId, CONNECTED_FRAME};
use crate::dev::SharedState;
use crate::embed;
use crate::error::{CliError, Result};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use tokio::net::TcpListener;
use tokio_stream::Stream;
use tower_http::trace::TraceLayer;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Paths owned by the server; assets with these names are not served.
const RESERVED: [&str; 5] = ["index.html", "wasm_exec.js", "favicon.png", "_notify", "_notify.js"];

/// Development server.
pub struct DevServer {
    state: SharedState,
}

impl DevServer {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Bind the listening socket. Failure is fatal to the caller.
    pub async fn bind(listen: &str) -> Result<TcpListener> {
        TcpListener::bind(listen)
            .await
            .map_err(|source| CliError::ListenFailed {
                addr: listen.to_string(),
                source,
            })
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let ctx = self.state.context();
        for asset in ctx.assets() {
            let name = basename(asset);
            if RESERVED.contains(&name.as_str()) || name == ctx.wasm_name() {
                tracing::warn!(asset = %asset.display(), "Asset name collides with a built-in route and will not be served");
            }
        }

        let routes = Router::new()
            .route("/", get(handle_index))
            .route("/index.html", get(handle_index))
            .route("/wasm_exec.js", get(handle_glue))
            .route("/favicon.png", get(handle_favicon))
            .route("/_notify", get(handle_notify))
            .route("/_notify.js", get(handle_notify_script))
            .fallback(handle_static)
            .with_state(self.state.clone());

        let base_path = ctx.base_path();
        let router = if base_path.is_empty() {
            routes
        } else {
            Router::new().nest(base_path, routes)
        };

        router.layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until the shutdown token is cancelled.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.router();
        let shutdown = self.state.shutdown().clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// Browser URL for a bound address.
pub fn server_url(addr: SocketAddr, base_path: &str) -> String {
    let host = if addr.ip().is_unspecified() {
        "localhost".to_string()
    } else if addr.is_ipv6() {
        format!("[{}]", addr.ip())
    } else {
        addr.ip().to_string()
    };
    let path = if base_path.is_empty() { "/" } else { base_path };
    format!("http://{}:{}{}", host, addr.port(), path)
}

fn ok(content_type: &'static str, body: impl Into<Body>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        body.into(),
    )
        .into_response()
}

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, NO_CACHE),
        ],
        format!("File not found: {}", path),
    )
        .into_response()
}

async fn handle_index(State(state): State<SharedState>) -> Response {
    let page = state.context().bootstrap().payload().to_vec();
    ok("text/html; charset=utf-8", page)
}

async fn handle_glue(State(state): State<SharedState>) -> Response {
    let glue = state.context().glue().payload().to_vec();
    ok("application/javascript; charset=utf-8", glue)
}

async fn handle_favicon(State(state): State<SharedState>) -> Response {
    ok("image/png", state.context().favicon().payload().to_vec())
}

async fn handle_notify_script() -> Response {
    match embed::resource(embed::NOTIFY_SCRIPT) {
        Ok(script) => ok("application/javascript; charset=utf-8", script),
        Err(e) => {
            tracing::error!(error = %e, "Live reload client unavailable");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Open an event stream for one browser.
async fn handle_notify(State(state): State<SharedState>) -> Response {
    let channel = state.broadcaster().register();
    let body = Body::from_stream(event_stream(state, channel));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

/// Unregisters the client when its stream is dropped.
struct Registration {
    state: SharedState,
    id: ClientId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.state.broadcaster().unregister(self.id);
    }
}

/// `connected`, then every message until the channel closes or the
/// process shuts down.
pub fn event_stream(
    state: SharedState,
    channel: ClientChannel,
) -> impl Stream<Item = std::result::Result<String, Infallible>> + Send + 'static {
    let ClientChannel { id, mut receiver } = channel;
    let shutdown = state.shutdown().clone();
    let registration = Registration { state, id };

    async_stream::stream! {
        let _registration = registration;
        yield Ok(CONNECTED_FRAME.to_string());

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                message = receiver.recv() => message,
            };
            match next {
                Some(message) => yield Ok(message.to_frame()),
                None => break,
            }
        }
    }
}

/// Artefact, assets, then the output directory.
async fn handle_static(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri.path();
    let Some(relative) = safe_relative(path) else {
        return not_found(path);
    };
    let ctx = state.context();

    if relative == Path::new(&ctx.wasm_name()) {
        return match state.artefact() {
            Some(artefact) => ok("application/wasm", artefact.payload().to_vec()),
            None => not_found(path),
        };
    }

    let candidate = resolve_asset(ctx.assets(), &relative)
        .filter(|p| p.is_file())
        .or_else(|| Some(ctx.output().join(&relative)).filter(|p| p.is_file()));

    let Some(file) = candidate else {
        return not_found(path);
    };

    match tokio::fs::read(&file).await {
        Ok(content) => ok(determine_content_type(&file), content),
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "Failed to read file");
            not_found(path)
        }
    }
}

/// Request path as a relative path of normal segments only.
pub fn safe_relative(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.contains('\\') || trimmed.contains('\0') {
        return None;
    }
    let relative = PathBuf::from(trimmed);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}

/// Map a request onto an asset by its basename. A file asset answers only
/// its own name; a directory asset answers anything beneath it.
pub fn resolve_asset(assets: &[PathBuf], relative: &Path) -> Option<PathBuf> {
    let mut components = relative.components();
    let first = components.next()?.as_os_str().to_string_lossy().into_owned();
    if RESERVED.contains(&first.as_str()) {
        return None;
    }
    let rest = components.as_path();

    assets
        .iter()
        .find(|asset| basename(asset) == first)
        .map(|asset| {
            if rest.as_os_str().is_empty() {
                asset.clone()
            } else {
                asset.join(rest)
            }
        })
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Determine content type from file extension.
pub fn determine_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "wasm" => "application/wasm",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative("/static/site.css"), Some(PathBuf::from("static/site.css")));
        assert_eq!(safe_relative("/app.wasm"), Some(PathBuf::from("app.wasm")));
        assert_eq!(safe_relative("/"), None);
        assert_eq!(safe_relative("/../etc/passwd"), None);
        assert_eq!(safe_relative("/static/../../secret"), None);
        assert_eq!(safe_relative("/./x"), None);
        assert_eq!(safe_relative("/a\\..\\b"), None);
    }

    #[test]
    fn test_resolve_asset_by_basename() {
        let assets = vec![PathBuf::from("/src/app/static"), PathBuf::from("/src/app/style.css")];

        assert_eq!(
            resolve_asset(&assets, Path::new("static/css/site.css")),
            Some(PathBuf::from("/src/app/static/css/site.css"))
        );
        assert_eq!(
            resolve_asset(&assets, Path::new("style.css")),
            Some(PathBuf::from("/src/app/style.css"))
        );
        assert_eq!(resolve_asset(&assets, Path::new("other.css")), None);
    }

    #[test]
    fn test_resolve_asset_skips_reserved_names() {
        let assets = vec![PathBuf::from("/src/app/index.html")];
        assert_eq!(resolve_asset(&assets, Path::new("index.html")), None);
    }

    #[test]
    fn test_determine_content_type() {
        assert_eq!(determine_content_type(Path::new("a.wasm")), "application/wasm");
        assert_eq!(
            determine_content_type(Path::new("wasm_exec.js")),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(determine_content_type(Path::new("x/STYLE.CSS")), "text/css; charset=utf-8");
        assert_eq!(determine_content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(determine_content_type(Path::new("LICENSE")), "application/octet-stream");
    }

    #[test]
    fn test_server_url() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        assert_eq!(server_url(addr, ""), "http://127.0.0.1:9090/");
        assert_eq!(server_url(addr, "/app"), "http://127.0.0.1:9090/app");

        let any: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        assert_eq!(server_url(any, ""), "http://localhost:8080/");

        let v6: SocketAddr = "[::1]:9090".parse().unwrap();
        assert_eq!(server_url(v6, ""), "http://[::1]:9090/");
    }
}
