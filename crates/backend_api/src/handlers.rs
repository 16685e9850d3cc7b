use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use models::{Holding, TransactionCandidate, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::{authenticate, AuthProvider},
    error::ApiError,
    repository::{HoldingsFilter, TransactionFilter, TransactionStore},
    Result,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub auth: Arc<dyn AuthProvider>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    25
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub page_size: usize,
}

/// POST /api/upload
/// Bulk insert of candidate rows; returns per-row outcomes.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&headers, state.auth.as_ref()).await?;

    let rows = body
        .get("rows")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ApiError::InvalidRequest("rows must be an array".to_string()))?;
    let candidates: Vec<TransactionCandidate> =
        serde_json::from_value(serde_json::Value::Array(rows.clone()))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let report = state.store.insert_candidates(&user_id, &candidates).await?;
    Ok(Json(report))
}

/// GET /api/holdings
/// Aggregated amounts per symbol, with an optional case-insensitive
/// substring filter.
pub async fn get_holdings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HoldingsParams>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&headers, state.auth.as_ref()).await?;

    let filter = HoldingsFilter {
        symbol: params.symbol,
        page: params.page,
        page_size: params.page_size,
    };
    let data: Vec<Holding> = state.store.holdings(&user_id, &filter).await?;

    Ok(Json(PageResponse {
        data,
        page: params.page,
        page_size: params.page_size,
    }))
}

/// GET /api/transactions
/// Transaction history, date descending, with symbol/file substring filters
/// and an inclusive date range.
pub async fn get_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TransactionsParams>,
) -> Result<impl IntoResponse> {
    let user_id = authenticate(&headers, state.auth.as_ref()).await?;

    let filter = TransactionFilter {
        symbol: params.symbol,
        file: params.file,
        from: parse_date_param(params.from.as_deref())?,
        to: parse_date_param(params.to.as_deref())?,
        page: params.page,
        page_size: params.page_size,
    };
    let data: Vec<TransactionRecord> = state.store.transactions(&user_id, &filter).await?;

    Ok(Json(PageResponse {
        data,
        page: params.page,
        page_size: params.page_size,
    }))
}

fn parse_date_param(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::InvalidDateFormat(s.to_string())),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "coinfolio-api"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_param() {
        assert_eq!(parse_date_param(None).unwrap(), None);
        assert_eq!(parse_date_param(Some("")).unwrap(), None);
        assert_eq!(
            parse_date_param(Some("2024-01-31")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert!(matches!(
            parse_date_param(Some("31/01/2024")),
            Err(ApiError::InvalidDateFormat(_))
        ));
    }
}
