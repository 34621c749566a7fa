// HTTP request handlers
use crate::application::assessment_service::Assessment;
use crate::domain::aqi::IndexOutOfRange;
use crate::domain::measurement::{InvalidMeasurement, Measurement};
use crate::domain::record::AqiRecord;
use crate::infrastructure::csv_interchange::InterchangeTables;
use crate::infrastructure::html_report::render_report;
use crate::infrastructure::http_response::{CSV, HTML, accepts_brotli, encoded_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AssessmentRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub measurement: Measurement,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub index: u16,
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ReclassifyRequest {
    pub index: u16,
}

#[derive(Serialize)]
pub struct RecordView {
    pub date: NaiveDate,
    pub measurement: Measurement,
    pub concentration: f64,
    pub index: u16,
    pub category: &'static str,
    pub color: &'static str,
}

impl From<&AqiRecord> for RecordView {
    fn from(record: &AqiRecord) -> Self {
        Self {
            date: record.date,
            measurement: record.measurement,
            concentration: record.concentration,
            index: record.index,
            category: record.category.label(),
            color: record.category.color(),
        }
    }
}

#[derive(Serialize)]
pub struct AssessmentView {
    #[serde(flatten)]
    pub record: RecordView,
    pub warnings: Vec<&'static str>,
}

impl From<&Assessment> for AssessmentView {
    fn from(assessment: &Assessment) -> Self {
        Self {
            record: RecordView::from(&assessment.record),
            warnings: assessment.warnings.iter().map(|w| w.message()).collect(),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn into_response(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

fn internal_error(context: &str, e: anyhow::Error) -> Response {
    tracing::error!("{}: {:#}", context, e);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, message).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Compute, store and return the AQI for one measurement
pub async fn create_assessment(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssessmentRequest>,
) -> Response {
    let date = request.date.unwrap_or_else(today);

    match state.assessment_service.assess(date, request.measurement).await {
        Ok(assessment) => into_response(
            json_response(&AssessmentView::from(&assessment), accepts_brotli(&headers)).await,
        ),
        Err(e) => match e.downcast_ref::<InvalidMeasurement>() {
            Some(invalid) => (StatusCode::UNPROCESSABLE_ENTITY, invalid.to_string()).into_response(),
            None => internal_error("Error saving assessment", e),
        },
    }
}

/// Stored records for one month (current month by default)
pub async fn list_assessments(
    Query(query): Query<MonthQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let now = today();
    let year = query.year.unwrap_or(now.year());
    let month = query.month.unwrap_or(now.month());

    match state.assessment_service.monthly_records(year, month).await {
        Ok(records) => {
            let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();
            into_response(json_response(&views, accepts_brotli(&headers)).await)
        }
        Err(e) => internal_error("Error fetching monthly records", e),
    }
}

/// Every stored record, newest first
pub async fn all_assessments(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    match state.assessment_service.all_records().await {
        Ok(records) => {
            let views: Vec<RecordView> = records.iter().map(RecordView::from).collect();
            into_response(json_response(&views, accepts_brotli(&headers)).await)
        }
        Err(e) => internal_error("Error fetching records", e),
    }
}

/// Stored record for one date
pub async fn get_assessment(
    Path(date): Path<NaiveDate>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.assessment_service.record_for(date).await {
        Ok(Some(record)) => {
            into_response(json_response(&RecordView::from(&record), accepts_brotli(&headers)).await)
        }
        Ok(None) => not_found(format!("No record found for date: {}", date)),
        Err(e) => internal_error("Error fetching record", e),
    }
}

/// Overwrite the stored index for a date
pub async fn reclassify_assessment(
    Path(date): Path<NaiveDate>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReclassifyRequest>,
) -> Response {
    match state.assessment_service.reclassify(date, request.index).await {
        Ok(Some(record)) => {
            into_response(json_response(&RecordView::from(&record), accepts_brotli(&headers)).await)
        }
        Ok(None) => not_found(format!("No record found for date: {}", date)),
        Err(e) => match e.downcast_ref::<IndexOutOfRange>() {
            Some(invalid) => (StatusCode::UNPROCESSABLE_ENTITY, invalid.to_string()).into_response(),
            None => internal_error("Error updating AQI value", e),
        },
    }
}

pub async fn delete_assessment(
    Path(date): Path<NaiveDate>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.assessment_service.delete(date).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(format!("No record found for date: {}", date)),
        Err(e) => internal_error("Error deleting record", e),
    }
}

pub async fn clear_assessments(State(state): State<Arc<AppState>>) -> Response {
    match state.assessment_service.clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal_error("Error clearing data", e),
    }
}

/// HTML report for the record stored on a date
pub async fn report(
    Path(date): Path<NaiveDate>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.report_service.build_report(date).await {
        Ok(Some(report)) => {
            let html = render_report(&report);
            into_response(encoded_response(html.into_bytes(), HTML, accepts_brotli(&headers)).await)
        }
        Ok(None) => not_found(format!("No AQI calculated for {}", date)),
        Err(e) => internal_error("Error generating report", e),
    }
}

/// Synthetic month-to-date chart series ending at `date` (today by default)
pub async fn history(
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let date = query.date.unwrap_or_else(today);
    let bars = state.report_service.history(query.index, date);
    into_response(json_response(&bars, accepts_brotli(&headers)).await)
}

async fn export_table(
    state: &AppState,
    compress: bool,
    select: impl FnOnce(InterchangeTables) -> String,
) -> Response {
    match state.interchange_service.export().await {
        Ok(Some(tables)) => {
            into_response(encoded_response(select(tables).into_bytes(), CSV, compress).await)
        }
        Ok(None) => not_found("No data available to export".to_string()),
        Err(e) => internal_error("Error exporting data", e),
    }
}

pub async fn export_measurements(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    export_table(&state, accepts_brotli(&headers), |t| t.measurements).await
}

pub async fn export_results(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    export_table(&state, accepts_brotli(&headers), |t| t.results).await
}

/// Import template for `measurements` or `results`
pub async fn export_template(
    Path(table): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let template = state.interchange_service.template();
    let body = match table.trim_end_matches(".csv") {
        "measurements" => template.measurements,
        "results" => template.results,
        other => return not_found(format!("Unknown table: {}", other)),
    };
    into_response(encoded_response(body.into_bytes(), CSV, accepts_brotli(&headers)).await)
}

/// Import both tables; responds with the per-row outcome
pub async fn import(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(tables): Json<InterchangeTables>,
) -> Response {
    match state.interchange_service.import(&tables).await {
        Ok(outcome) => {
            let status = if outcome.validation_errors.is_empty() {
                StatusCode::OK
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            let mut response = into_response(json_response(&outcome, accepts_brotli(&headers)).await);
            if response.status() == StatusCode::OK {
                *response.status_mut() = status;
            }
            response
        }
        Err(e) => internal_error("Error importing data", e),
    }
}
