use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[path = "../config.rs"]
mod config;
#[path = "../controls.rs"]
mod controls;
#[path = "../page.rs"]
mod page;
#[path = "../render.rs"]
mod render;
#[path = "../resolver.rs"]
mod resolver;
#[path = "../selection.rs"]
mod selection;

use config::ConfigSource;
use controls::Group;
use page::{InputEvent, PageController, PageError, Profile};
use render::PageTemplate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileKind {
    Static,
    Dynamic,
}

#[derive(Parser, Debug)]
#[command(name = "halo-viewer-web")]
#[command(about = "Serve the halo image browser")]
struct Args {
    /// static: hardcoded options under images/; dynamic: options from --config
    #[arg(long, value_enum, default_value = "dynamic")]
    profile: ProfileKind,
    /// Path or http(s) URL of params.json
    #[arg(long, default_value = "params.json")]
    config: String,
    /// Page template with {{particles}} {{branches}} {{ptypes}} {{index}} {{image}} slots
    #[arg(long)]
    template: Option<PathBuf>,
    /// Directory image paths are resolved against
    #[arg(long, default_value = ".")]
    image_root: PathBuf,
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

/// Lifecycle of the page behind the one configuration fetch.
#[derive(Clone, Debug)]
enum PageState {
    Loading,
    Ready(Profile),
    Unavailable(String),
}

#[derive(Clone)]
struct AppState {
    page: Arc<RwLock<PageState>>,
    template: Arc<PageTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    index: Option<String>,
    particles: Option<String>,
    branch: Option<String>,
    component: Option<String>,
}

/// Query parameters replayed as input events. An empty value clears its group.
fn events_from_query(q: PageQuery) -> Vec<InputEvent> {
    let mut events = Vec::new();
    for (group, value) in [
        (Group::Particles, q.particles),
        (Group::Branch, q.branch),
        (Group::Component, q.component),
    ] {
        match value {
            Some(key) if key.trim().is_empty() => events.push(InputEvent::Clear(group)),
            Some(key) => events.push(InputEvent::Check { group, key }),
            None => {}
        }
    }
    if let Some(index) = q.index {
        events.push(InputEvent::HaloIndex(index));
    }
    events
}

fn render_page(profile: Profile, template: &PageTemplate, query: PageQuery) -> Result<String, PageError> {
    let mut page = PageController::new(profile);
    page.initialize()?;
    for event in events_from_query(query) {
        if let Err(e) = page.handle(event) {
            warn!("ignoring input: {e}");
        }
    }
    Ok(template.render(&page))
}

async fn index(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Response {
    let current = state.page.read().await.clone();
    match current {
        PageState::Loading => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "1")],
            Html(state.template.render_status("Loading configuration...")),
        )
            .into_response(),
        PageState::Unavailable(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(
                state
                    .template
                    .render_status(&format!("Halo images unavailable: {reason}")),
            ),
        )
            .into_response(),
        PageState::Ready(profile) => match render_page(profile, &state.template, q) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("page render failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
    }
}

async fn params(State(state): State<AppState>) -> Response {
    let current = state.page.read().await.clone();
    match current {
        PageState::Ready(Profile::Dynamic(config)) => match config.to_json_pretty() {
            Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
        PageState::Ready(Profile::Static) => StatusCode::NOT_FOUND.into_response(),
        _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match &*state.page.read().await {
        PageState::Loading => (StatusCode::SERVICE_UNAVAILABLE, "loading".to_string()),
        PageState::Ready(_) => (StatusCode::OK, "ok".to_string()),
        PageState::Unavailable(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unavailable: {reason}"))
        }
    }
}

/// Runs the configuration fetch to completion and publishes the outcome. No retry.
async fn load_profile(source: ConfigSource, page: Arc<RwLock<PageState>>) {
    let next = match source.load().await {
        Ok(config) => {
            info!(
                snap_nr = config.snap_nr,
                nr_halos = config.nr_halos,
                "configuration ready"
            );
            PageState::Ready(Profile::Dynamic(Arc::new(config)))
        }
        Err(e) => {
            error!("configuration from {source} unavailable: {e}");
            PageState::Unavailable(e.to_string())
        }
    };
    *page.write().await = next;
}

fn router(state: AppState, image_root: PathBuf) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/params.json", get(params))
        .route("/healthz", get(healthz))
        .fallback_service(ServeDir::new(image_root))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let template = match &args.template {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read template {}", path.display()))?;
            PageTemplate::new(text).with_context(|| format!("template {}", path.display()))?
        }
        None => PageTemplate::builtin(),
    };

    let page = Arc::new(RwLock::new(PageState::Loading));
    match args.profile {
        ProfileKind::Static => *page.write().await = PageState::Ready(Profile::Static),
        ProfileKind::Dynamic => {
            tokio::spawn(load_profile(ConfigSource::parse(&args.config), page.clone()));
        }
    }

    let state = AppState {
        page,
        template: Arc::new(template),
    };
    let app = router(state, args.image_root.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!(profile = ?args.profile, image_root = %args.image_root.display(), "serving on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app).await.context("server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Configuration;

    const SAMPLE: &str = r#"{"snap_nr":7,"nr_halos":3,"branches":{"default":{},"alt":{}},"ptypes":["stars","dark_matter"]}"#;

    fn dynamic() -> Profile {
        Profile::Dynamic(Arc::new(Configuration::from_json(SAMPLE).unwrap()))
    }

    #[test]
    fn query_becomes_events_in_order() {
        let events = events_from_query(PageQuery {
            index: Some("2".to_string()),
            particles: Some("satellite".to_string()),
            branch: Some(String::new()),
            component: None,
        });
        assert_eq!(
            events,
            vec![
                InputEvent::Check {
                    group: Group::Particles,
                    key: "satellite".to_string()
                },
                InputEvent::Clear(Group::Branch),
                InputEvent::HaloIndex("2".to_string()),
            ]
        );
    }

    #[test]
    fn rendered_page_reflects_query() {
        let html = render_page(
            dynamic(),
            &PageTemplate::builtin(),
            PageQuery {
                index: Some("2".to_string()),
                particles: Some("satellite".to_string()),
                branch: Some("alt".to_string()),
                component: Some("dark_matter".to_string()),
            },
        )
        .unwrap();
        assert!(html.contains(r#"src="alt/satellites_dark_matter_0007_halo_2.png""#));
        assert!(html.contains(r#"id="satellite" value="satellite" checked"#));
    }

    #[test]
    fn bad_query_values_fall_back_to_defaults() {
        let html = render_page(
            dynamic(),
            &PageTemplate::builtin(),
            PageQuery {
                branch: Some("nope".to_string()),
                index: Some("x".to_string()),
                ..PageQuery::default()
            },
        )
        .unwrap();
        assert!(html.contains(r#"src="default/fof_stars_0007_halo_0.png""#));
    }

    #[tokio::test]
    async fn failed_fetch_marks_page_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let page = Arc::new(RwLock::new(PageState::Loading));
        load_profile(ConfigSource::File(dir.path().join("missing.json")), page.clone()).await;
        assert!(matches!(&*page.read().await, PageState::Unavailable(reason) if reason.contains("missing.json")));
    }

    #[tokio::test]
    async fn malformed_config_marks_page_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"snap_nr":7}"#).unwrap();
        let page = Arc::new(RwLock::new(PageState::Loading));
        load_profile(ConfigSource::File(path), page.clone()).await;
        assert!(matches!(&*page.read().await, PageState::Unavailable(_)));
    }

    #[tokio::test]
    async fn good_config_makes_page_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let page = Arc::new(RwLock::new(PageState::Loading));
        load_profile(ConfigSource::File(path), page.clone()).await;
        assert!(matches!(&*page.read().await, PageState::Ready(Profile::Dynamic(c)) if c.nr_halos == 3));
    }
}
