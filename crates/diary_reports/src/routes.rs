//! HTTP surface: report and export endpoints plus health and metrics.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::debug_handler;
use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;

use crate::ReportEngine;
use crate::dates::parse_opt_date_key;
use crate::domains::{history_report, phase::parse_phase, phase_report, rolling_report, weekly_report};
use crate::error::{ReportError, ReportResult};
use crate::export::{PdfOptions, PhotoSource, export_csv, export_filename, export_filter, export_pdf};
use crate::session::SessionResolver;

pub struct AppState {
    pub engine: ReportEngine,
    pub sessions: SessionResolver,
    pub photos: Arc<dyn PhotoSource>,
    /// `None` when no recorder is installed (tests).
    pub metrics: Option<PrometheusHandle>,
}

type Params = Query<HashMap<String, String>>;

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

/// Count the request and, unless it was unauthorized, its failure.
async fn observed<T, F>(view: &'static str, fut: F) -> ReportResult<T>
where
    F: Future<Output = ReportResult<T>>,
{
    metrics::counter!("diary_report_requests_total", "view" => view).increment(1);
    let result = fut.await;
    if matches!(&result, Err(e) if !matches!(e, ReportError::Unauthorized)) {
        metrics::counter!("diary_report_failures_total", "view" => view).increment(1);
    }
    result
}

fn json_no_store<T: Serialize>(value: &T) -> ReportResult<Response> {
    let body = serde_json::to_vec(value)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response())
}

fn attachment(body: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn rolling(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, ReportError> {
    observed("rolling", async {
        let user = state.sessions.resolve(&headers)?;
        let to = parse_opt_date_key(param(&params, "to"));
        json_no_store(&rolling_report(&state.engine, user, to).await?)
    })
    .await
}

#[debug_handler]
async fn weekly(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, ReportError> {
    observed("weekly", async {
        let user = state.sessions.resolve(&headers)?;
        let from = parse_opt_date_key(param(&params, "from"));
        json_no_store(&weekly_report(&state.engine, user, from).await?)
    })
    .await
}

#[debug_handler]
async fn phase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, ReportError> {
    observed("phase", async {
        let user = state.sessions.resolve(&headers)?;
        let phase = parse_phase(param(&params, "phase"));
        json_no_store(&phase_report(&state.engine, user, phase).await?)
    })
    .await
}

#[debug_handler]
async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ReportError> {
    observed("history", async {
        let user = state.sessions.resolve(&headers)?;
        json_no_store(&history_report(&state.engine, user).await?)
    })
    .await
}

#[debug_handler]
async fn csv_export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, ReportError> {
    observed("csv", async {
        let user = state.sessions.resolve(&headers)?;
        let filter = export_filter(
            parse_opt_date_key(param(&params, "from")),
            parse_opt_date_key(param(&params, "to")),
            param(&params, "month"),
        );
        let body = export_csv(&state.engine, user, &filter).await?;
        let filename = export_filename(state.engine.calendar().today(), "csv");
        Ok(attachment(body, "text/csv; charset=utf-8", &filename))
    })
    .await
}

#[debug_handler]
async fn pdf_export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Params,
) -> Result<Response, ReportError> {
    observed("pdf", async {
        let user = state.sessions.resolve(&headers)?;
        let filter = export_filter(
            parse_opt_date_key(param(&params, "from")),
            parse_opt_date_key(param(&params, "to")),
            param(&params, "month"),
        );
        let options = PdfOptions::from_params(param(&params, "photos"), param(&params, "thumb"));
        let pdf = export_pdf(
            &state.engine,
            user,
            &filter,
            options,
            state.photos.as_ref(),
        )
        .await?;
        let filename = export_filename(state.engine.calendar().today(), "pdf");
        Ok(attachment(pdf.bytes, "application/pdf", &filename))
    })
    .await
}

pub fn app(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/reports/rolling", get(rolling))
        .route("/api/reports/weekly", get(weekly))
        .route("/api/reports/phase", get(phase))
        .route("/api/reports/history", get(history))
        .route("/api/export/csv", get(csv_export))
        .route("/api/export/pdf", get(pdf_export))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
