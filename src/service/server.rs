use crate::common::{Config, DevMode, OptimizerError, Result};
use crate::core::{Quality, SessionSettings, UploadedImage};
use crate::service::page::PageRenderer;
use crate::service::protocol::{DownloadQuery, HealthResponse, SelectForm, SessionReport};
use crate::service::registry::{spawn_sweeper, SessionRegistry};
use crate::storage::read_all;
use axum::extract::{DefaultBodyLimit, Form, Multipart, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(config: &Config, dev_mode: &DevMode) -> Result<Self> {
        let settings = SessionSettings::from_config(&config.optimizer)?;
        let registry = SessionRegistry::new(
            settings,
            dev_mode.sessions_root(&config.storage),
            dev_mode.keep_artifacts(&config.storage),
            &config.session,
        );

        Ok(Self {
            registry: Arc::new(registry),
            pages: Arc::new(PageRenderer::new()?),
        })
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(session_page).delete(close_session))
        .route("/sessions/{id}/upload", post(reupload))
        .route("/sessions/{id}/original", get(original))
        .route("/sessions/{id}/select", post(select_quality))
        .route("/sessions/{id}/download", get(download))
        .route("/api/sessions/{id}", get(session_report))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until Ctrl+C / SIGTERM.
pub async fn serve(config: Config, dev_mode: DevMode) -> anyhow::Result<()> {
    let state = AppState::new(&config, &dev_mode)?;
    let sweeper = spawn_sweeper(
        state.registry.clone(),
        Duration::from_secs(config.session.sweep_interval_seconds),
    );
    let app = router(state, config.max_upload_bytes());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "image-optimizer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OptimizerError::Upload(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| OptimizerError::Upload("Upload is missing a filename".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| OptimizerError::Upload(format!("Failed to read upload: {}", e)))?;

        return UploadedImage::new(&filename, data.to_vec());
    }

    Err(OptimizerError::Upload("No file was uploaded".into()))
}

fn session_location(id: &str) -> String {
    format!("/sessions/{}", id)
}

async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    Ok(Html(state.pages.render_index()?))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.registry.len().await,
    })
}

async fn create_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect> {
    let image = read_upload(multipart).await?;
    let (id, _) = state.registry.create(image).await?;
    Ok(Redirect::to(&session_location(&id)))
}

async fn reupload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect> {
    let image = read_upload(multipart).await?;
    state
        .registry
        .with_session_blocking(&id, move |session| session.process(image))
        .await?;
    Ok(Redirect::to(&session_location(&id)))
}

async fn session_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let report = state
        .registry
        .with_session(&id, |session| {
            session.touch();
            Ok(SessionReport::from_session(session))
        })
        .await?;
    Ok(Html(state.pages.render_session(&report)?))
}

async fn session_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionReport>> {
    let report = state
        .registry
        .with_session(&id, |session| {
            session.touch();
            Ok(SessionReport::from_session(session))
        })
        .await?;
    Ok(Json(report))
}

async fn original(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (content_type, body) = state
        .registry
        .with_session_blocking(&id, |session| {
            let (Some(image), Some(path)) = (session.uploaded(), session.temp_path()) else {
                return Err(OptimizerError::InvalidTransition {
                    action: "preview",
                    state: session.state().as_str(),
                });
            };
            Ok((image.kind().content_type(), read_all(&path)?))
        })
        .await?;

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

async fn select_quality(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SelectForm>,
) -> Result<Redirect> {
    let quality = Quality::new(form.quality)?;
    state
        .registry
        .with_session(&id, |session| session.select(quality).map(|_| ()))
        .await?;
    Ok(Redirect::to(&session_location(&id)))
}

async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let quality = query.quality.map(Quality::new).transpose()?;
    let download = state
        .registry
        .with_session(&id, |session| {
            if let Some(quality) = quality {
                session.select(quality)?;
            }
            session.download()
        })
        .await?;

    let content_type = HeaderValue::from_str(&download.content_type)
        .map_err(|e| OptimizerError::Other(anyhow::anyhow!("Invalid content type: {}", e)))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace(['"', '\\'], "_")
    );
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .map_err(|e| OptimizerError::Other(anyhow::anyhow!("Invalid filename header: {}", e)))?;

    let mut response = download.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.registry.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(OptimizerError::SessionNotFound(id))
    }
}
