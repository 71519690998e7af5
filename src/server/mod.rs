//! HTTP server: per-request rendering, the comment endpoint and live reload

mod error;

pub use error::AppError;

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::comments::{self, CommentInput};
use crate::content::Comment;
use crate::helpers::encode_path_segment;
use crate::pages::{PageRenderer, Rendered};
use crate::resolver::PostResolver;
use crate::store::ContentStore;
use crate::Blog;

/// Cookie that carries draft mode
pub const DRAFT_COOKIE: &str = "blog_draft_mode";

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state shared by every request
pub struct AppState {
    store: Arc<dyn ContentStore>,
    pages: PageRenderer,
    static_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        pages: PageRenderer,
        static_dir: PathBuf,
        live_reload: bool,
    ) -> Self {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Self {
            store,
            pages,
            static_dir,
            reload_tx,
            live_reload,
        }
    }

    /// Tell connected browsers to reload
    pub fn reload(&self) {
        let _ = self.reload_tx.send(());
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/posts/:slug", get(post_handler))
        .route("/api/posts/:slug/comment", post(comment_handler))
        .route("/preview", get(preview_handler))
        .route("/preview/exit", get(exit_preview_handler));

    if state.live_reload {
        app = app.route("/__livereload", get(livereload_handler));
    }

    app.nest_service("/static", ServeDir::new(&state.static_dir))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let store = blog.store()?;
    let pages = PageRenderer::new(blog.config.clone())?;
    let state = Arc::new(AppState::new(
        store,
        pages,
        blog.static_dir.clone(),
        watch,
    ));

    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let paths = vec![
            blog.content_dir.clone(),
            blog.static_dir.clone(),
            blog.base_dir.join("_config.yml"),
        ];
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(paths, state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch content and assets; pages render per request, so a change only
/// needs the browsers to reload
fn watch_and_reload(paths: Vec<PathBuf>, state: Arc<AppState>) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for path in &paths {
        if path.is_dir() {
            debouncer.watcher().watch(path, RecursiveMode::Recursive)?;
        } else if path.exists() {
            debouncer.watcher().watch(path, RecursiveMode::NonRecursive)?;
        } else {
            continue;
        }
        tracing::debug!("Watching: {:?}", path);
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        let path_str = e.path.to_string_lossy();
                        !path_str.contains(".git")
                            && !path_str.contains(".DS_Store")
                            && !path_str.ends_with('~')
                            && !path_str.ends_with(".tmp")
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    println!("File changed: {}", event.path.display());
                }
                state.reload();
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Whether the request carries a valid draft-mode cookie. Without a
/// configured preview secret draft mode is never on.
fn draft_mode(headers: &HeaderMap, state: &AppState) -> bool {
    let secret = match state.pages.config().preview_secret.as_deref() {
        Some(secret) if !secret.is_empty() => encode_path_segment(secret),
        _ => return false,
    };

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == DRAFT_COOKIE && value == secret)
}

fn html_response(state: &AppState, status: StatusCode, html: String) -> Response {
    let html = if state.live_reload {
        inject_live_reload(&html)
    } else {
        html
    };
    (status, Html(html)).into_response()
}

fn redirect_response(location: &str) -> Result<Response, AppError> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| AppError::Validation(format!("invalid redirect target {:?}", location)))?;
    Ok((StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response())
}

async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let draft = draft_mode(&headers, &state);
    match state.pages.listing_page(state.store.as_ref(), draft).await {
        Ok(html) => html_response(&state, StatusCode::OK, html),
        Err(e) => AppError::from(e).into_page(&state.pages),
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let draft = draft_mode(&headers, &state);
    // One resolver per request; dropped with it
    let resolver = PostResolver::new(state.store.clone());

    let rendered = state.pages.post_page(&resolver, &slug, draft).await;
    match rendered {
        Ok(Rendered::Page(html)) => html_response(&state, StatusCode::OK, html),
        Ok(Rendered::NotFound(html)) => html_response(&state, StatusCode::NOT_FOUND, html),
        Ok(Rendered::Redirect(to)) => {
            redirect_response(&to).unwrap_or_else(|e| e.into_page(&state.pages))
        }
        Err(e) => AppError::from(e).into_page(&state.pages),
    }
}

async fn comment_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Form(input): Form<CommentInput>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let limits = &state.pages.config().comments;
    if !limits.enabled {
        return Err(AppError::Forbidden("comments are disabled".to_string()));
    }

    let stored = comments::submit(state.store.as_ref(), &slug, input, limits).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    secret: Option<String>,
    path: Option<String>,
}

/// Enable draft mode and send the browser to the previewed page
async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PreviewParams>,
) -> Result<Response, AppError> {
    let secret = state
        .pages
        .config()
        .preview_secret
        .as_deref()
        .filter(|s| !s.is_empty());

    match (secret, params.secret.as_deref()) {
        (Some(expected), Some(given)) if expected == given => {}
        _ => return Err(AppError::Forbidden("invalid preview secret".to_string())),
    }

    let path = params.path.unwrap_or_else(|| "/".to_string());
    // Local paths only
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(AppError::Validation(format!("invalid preview path {:?}", path)));
    }

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        DRAFT_COOKIE,
        encode_path_segment(secret.unwrap_or_default())
    );
    let mut response = redirect_response(&path)?;
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| AppError::Render(e.into()))?;
    response.headers_mut().insert(header::SET_COOKIE, cookie);

    tracing::info!("Draft mode enabled for {}", path);
    Ok(response)
}

/// Leave draft mode
async fn exit_preview_handler() -> Response {
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", DRAFT_COOKIE);
    (
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response()
}

async fn fallback_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let draft = draft_mode(&headers, &state);
    match state.pages.not_found_page(draft) {
        Ok(html) => html_response(&state, StatusCode::NOT_FOUND, html),
        Err(e) => AppError::from(e).into_page(&state.pages),
    }
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{Post, Status};
    use crate::store::{MemoryStore, Redirect};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app_with(config: SiteConfig, live_reload: bool) -> Router {
        let mut draft = Post::new("2", "wip", "Work In Progress");
        draft.status = Status::Draft;
        let store = MemoryStore::new(vec![Post::new("1", "intro", "Intro"), draft])
            .with_redirects(vec![Redirect {
                from: "/posts/old".to_string(),
                to: "/posts/intro".to_string(),
            }]);

        let pages = PageRenderer::new(config).unwrap();
        let state = AppState::new(Arc::new(store), pages, PathBuf::from("static"), live_reload);
        router(Arc::new(state))
    }

    fn app() -> Router {
        let config = SiteConfig {
            preview_secret: Some("s3cret".to_string()),
            ..SiteConfig::default()
        };
        app_with(config, false)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_listing_and_post_pages() {
        let response = app().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Intro"));
        assert!(!html.contains("Work In Progress"));

        let response = app().oneshot(get("/posts/intro")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Intro"));
    }

    #[tokio::test]
    async fn test_missing_post_is_404() {
        let response = app().oneshot(get("/posts/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("This page could not be found."));

        let response = app().oneshot(get("/no/such/route")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_redirected_post() {
        let response = app().oneshot(get("/posts/old")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/posts/intro");
    }

    #[tokio::test]
    async fn test_comment_is_created() {
        let response = app()
            .oneshot(post_form("/api/posts/intro/comment", "name=Ada&comment=Great+post%21"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let stored: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(stored["name"], "Ada");
        assert_eq!(stored["comment"], "Great post!");
    }

    #[tokio::test]
    async fn test_comment_rejections() {
        let response = app()
            .oneshot(post_form("/api/posts/intro/comment", "name=&comment=hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(error["status"], 400);

        let response = app()
            .oneshot(post_form("/api/posts/nope/comment", "name=Ada&comment=hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app()
            .oneshot(post_form("/api/posts/wip/comment", "name=Ada&comment=hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let mut config = SiteConfig::default();
        config.comments.enabled = false;
        let response = app_with(config, false)
            .oneshot(post_form("/api/posts/intro/comment", "name=Ada&comment=hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_preview_requires_secret() {
        let response = app()
            .oneshot(get("/preview?secret=wrong&path=/posts/wip"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app_with(SiteConfig::default(), false)
            .oneshot(get("/preview?secret=&path=/posts/wip"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app()
            .oneshot(get("/preview?secret=s3cret&path=//evil.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_draft_mode_shows_drafts() {
        let response = app()
            .oneshot(get("/preview?secret=s3cret&path=/posts/wip"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/posts/wip");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("blog_draft_mode=s3cret;"));

        let response = app().oneshot(get("/posts/wip")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri("/posts/wip")
            .header(header::COOKIE, "theme=dark; blog_draft_mode=s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Work In Progress"));
        assert!(html.contains("draft-banner"));
    }

    #[tokio::test]
    async fn test_exit_preview_clears_cookie() {
        let response = app().oneshot(get("/preview/exit")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_live_reload_injection() {
        let response = app_with(SiteConfig::default(), true)
            .oneshot(get("/posts/intro"))
            .await
            .unwrap();
        assert!(body_text(response).await.contains("/__livereload"));

        let response = app().oneshot(get("/posts/intro")).await.unwrap();
        assert!(!body_text(response).await.contains("/__livereload"));
    }

    #[test]
    fn test_inject_live_reload() {
        let html = "<html><body>Hello</body></html>";
        let injected = inject_live_reload(html);
        assert!(injected.contains("WebSocket"));
        assert!(injected.ends_with("</body>\n</html>"));
    }
}
