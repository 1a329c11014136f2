use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::ingest::{read_table_from_bytes, reconciled_to_csv, table_to_csv};
use crate::models::{InsightsSummary, PipelineWarning, ReconciledLine, Table};
use crate::service::{OpportunityService, ReconciliationService};
use axum::{
    extract::{Json, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const NO_MATCHES: &str = "No data matches the filtering criteria.";

/// 共享状态: 只读配置 (每个请求独立构建表, 无跨请求缓存)
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

/// 机会分析响应体
#[derive(Debug, Serialize)]
pub struct OpportunityResponse {
    pub success: bool,
    pub message: String,
    pub warning: Option<PipelineWarning>,
    pub insights: Option<InsightsSummary>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<crate::models::Cell>>,
}

/// 未结 PO 对账响应体
#[derive(Debug, Serialize)]
pub struct OpenPoResponse {
    pub success: bool,
    pub message: String,
    pub warning: Option<PipelineWarning>,
    pub reference_currency: Option<String>,
    pub rows: Vec<ReconciledLine>,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// 请求错误: 上传解析失败或流水线失败
#[derive(Debug)]
pub enum ApiError {
    BadUpload(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadUpload(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Pipeline(e) => {
                let status = match &e {
                    PipelineError::Schema { .. }
                    | PipelineError::UnknownCurrency { .. }
                    | PipelineError::InvalidValue { .. }
                    | PipelineError::UnsupportedFormat(_)
                    | PipelineError::EmptyInput(_)
                    | PipelineError::Csv(_)
                    | PipelineError::Workbook(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                tracing::error!("Pipeline failed: {}", e);
                (status, format!("Error: {}", e))
            }
        };
        let body = ErrorResponse {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 收集 multipart 文件字段: 字段名 -> (文件名, 内容)
async fn collect_uploads(
    mut multipart: Multipart,
) -> Result<HashMap<String, (String, Vec<u8>)>, ApiError> {
    let mut files = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .file_name()
            .map(|f| f.to_string())
            .unwrap_or_else(|| format!("{}.csv", name));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadUpload(format!("Failed to read field '{}': {}", name, e)))?;
        files.insert(name, (file_name, bytes.to_vec()));
    }
    Ok(files)
}

fn take_table(
    files: &mut HashMap<String, (String, Vec<u8>)>,
    field: &str,
) -> Result<Table, ApiError> {
    let (file_name, bytes) = files
        .remove(field)
        .ok_or_else(|| ApiError::BadUpload(format!("Missing upload field '{}'", field)))?;
    Ok(read_table_from_bytes(&file_name, bytes)?)
}

fn csv_attachment(bytes: Vec<u8>, file_name: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// 机会分析 (字段 file)
pub fn process_opportunity(config: &AppConfig, table: &Table) -> Result<OpportunityResponse, ApiError> {
    let service = OpportunityService::from_config(&config.opportunity)?;
    let report = service.run(table)?;

    let message = if report.is_empty() {
        NO_MATCHES.to_string()
    } else {
        format!("Processed {} matching rows", report.records.len())
    };
    Ok(OpportunityResponse {
        success: true,
        message,
        warning: report.warning,
        insights: report.insights,
        columns: report.table.columns().to_vec(),
        rows: report.table.rows().to_vec(),
    })
}

/// 未结 PO 对账 (字段 open_po, benchmark)
pub fn process_open_po(
    config: &AppConfig,
    open_po: &Table,
    benchmark: &Table,
) -> Result<OpenPoResponse, ApiError> {
    let service = ReconciliationService::from_config(&config.open_po)?;
    let report = service.run(open_po, benchmark)?;

    let message = if report.is_empty() {
        NO_MATCHES.to_string()
    } else {
        format!("Reconciled {} open PO lines", report.lines.len())
    };
    Ok(OpenPoResponse {
        success: true,
        message,
        warning: report.warning,
        reference_currency: Some(report.reference_currency),
        rows: report.lines,
    })
}

pub async fn opportunity(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OpportunityResponse>, ApiError> {
    let mut files = collect_uploads(multipart).await?;
    let table = take_table(&mut files, "file")?;
    Ok(Json(process_opportunity(&state.config, &table)?))
}

pub async fn opportunity_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut files = collect_uploads(multipart).await?;
    let table = take_table(&mut files, "file")?;
    let report = OpportunityService::from_config(&state.config.opportunity)?.run(&table)?;
    Ok(csv_attachment(table_to_csv(&report.table)?, "processed_data.csv"))
}

pub async fn open_po(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OpenPoResponse>, ApiError> {
    let mut files = collect_uploads(multipart).await?;
    let po = take_table(&mut files, "open_po")?;
    let wb = take_table(&mut files, "benchmark")?;
    Ok(Json(process_open_po(&state.config, &po, &wb)?))
}

pub async fn open_po_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut files = collect_uploads(multipart).await?;
    let po = take_table(&mut files, "open_po")?;
    let wb = take_table(&mut files, "benchmark")?;
    let report = ReconciliationService::from_config(&state.config.open_po)?.run(&po, &wb)?;
    Ok(csv_attachment(reconciled_to_csv(&report)?, "open_po_reconciliation.csv"))
}
