mod auth;
mod config;
mod error;
mod ocr;
mod state;
mod templates;
mod upload;

use anyhow::Context;
use askama::Template;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;
use crate::ocr::{PredictionResult, TesseractEngine};
use crate::state::AppState;
use crate::templates::HomeTemplate;
use crate::upload::MAX_FILE_SIZE;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = config::Config::from_env().context("invalid configuration")?;

    let default_filter = if config.debug {
        "ocrserve=debug,tower_http=debug"
    } else {
        "ocrserve=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        debug = config.debug,
        echo_active = config.echo_active,
        skip_auth = config.auth_bypassed(),
        prod_token = config.auth_token_prod.is_some(),
        "ocrserve starting"
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config, Arc::new(TesseractEngine::new())));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on http://localhost:{}", port);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(predict))
        .route("/img-echo/", post(img_echo))
        .route("/img-echo", post(img_echo))
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    tracing::debug!(debug = state.config.debug, "rendering home");
    Ok(Html(HomeTemplate::new(state.config.debug).render()?))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, AppError> {
    let file = upload::read_file(multipart).await?;
    auth::verify_headers(&headers, &state.config)?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id, filename = %file.filename);
    let engine = state.ocr.clone();

    let result = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        ocr::predict(engine.as_ref(), &file.bytes)
    })
    .await??;

    Ok(Json(result))
}

async fn img_echo(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    if !state.config.echo_active {
        return Err(AppError::EchoDisabled);
    }
    let file = upload::read_file(multipart).await?;

    let disposition = format!("inline; filename=\"{}\"", file.filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
