//! API Routes
//!
//! Chart-of-accounts endpoints. Each handler receives a [`Lease`] already
//! bound to the caller and delegates to the repository behind it.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::context::AppContext;
use crate::domain::{Account, ChartOfAccounts};
use crate::error::AppResult;
use crate::pool::Lease;

use super::extract::Decoder;

/// Successful handler result.
///
/// A value is written as JSON; no value is answered with an empty body.
#[derive(Debug)]
pub struct Reply<T>(pub Option<T>);

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self.0 {
            Some(value) => Json(value).into_response(),
            None => StatusCode::OK.into_response(),
        }
    }
}

impl<T> From<T> for Reply<T> {
    fn from(value: T) -> Self {
        Reply(Some(value))
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppContext> {
    Router::new()
        .route(
            "/charts-of-accounts",
            get(list_charts).post(create_chart),
        )
        .route(
            "/charts-of-accounts/:coa",
            get(get_chart).put(put_chart),
        )
        .route(
            "/charts-of-accounts/:coa/accounts",
            get(list_accounts).post(create_account),
        )
        .route(
            "/charts-of-accounts/:coa/accounts/:account",
            get(get_account).put(put_account),
        )
}

// =========================================================================
// Charts of accounts
// =========================================================================

async fn list_charts(lease: Lease) -> AppResult<Reply<Vec<ChartOfAccounts>>> {
    Ok(lease.list_charts().await?.into())
}

async fn get_chart(lease: Lease, Path(coa): Path<String>) -> AppResult<Reply<ChartOfAccounts>> {
    Ok(Reply(lease.get_chart(&coa).await?))
}

async fn create_chart(lease: Lease, body: Decoder) -> AppResult<Reply<ChartOfAccounts>> {
    Ok(save_chart(&lease, None, body).await?.into())
}

async fn put_chart(
    lease: Lease,
    Path(coa): Path<String>,
    body: Decoder,
) -> AppResult<Reply<ChartOfAccounts>> {
    Ok(save_chart(&lease, Some(coa), body).await?.into())
}

/// The path id wins over any id in the body, and the owner is always the caller
async fn save_chart(
    lease: &Lease,
    coa: Option<String>,
    body: Decoder,
) -> AppResult<ChartOfAccounts> {
    let mut chart: ChartOfAccounts = body.decode().await?;
    if let Some(coa) = coa.filter(|id| !id.is_empty()) {
        chart.id = coa;
    }
    chart.user = lease.identity().to_string();

    Ok(lease.save_chart(chart).await?)
}

// =========================================================================
// Accounts
// =========================================================================

async fn list_accounts(lease: Lease, Path(coa): Path<String>) -> AppResult<Reply<Vec<Account>>> {
    Ok(lease.list_accounts(&coa).await?.into())
}

async fn get_account(
    lease: Lease,
    Path((coa, account)): Path<(String, String)>,
) -> AppResult<Reply<Account>> {
    Ok(Reply(lease.get_account(&coa, &account).await?))
}

async fn create_account(
    lease: Lease,
    Path(coa): Path<String>,
    body: Decoder,
) -> AppResult<Reply<Account>> {
    Ok(save_account(&lease, &coa, None, body).await?.into())
}

async fn put_account(
    lease: Lease,
    Path((coa, account)): Path<(String, String)>,
    body: Decoder,
) -> AppResult<Reply<Account>> {
    Ok(save_account(&lease, &coa, Some(account), body).await?.into())
}

async fn save_account(
    lease: &Lease,
    coa: &str,
    account_id: Option<String>,
    body: Decoder,
) -> AppResult<Account> {
    let mut account: Account = body.decode().await?;
    if let Some(id) = account_id.filter(|id| !id.is_empty()) {
        account.id = id;
    }
    account.user = lease.identity().to_string();

    Ok(lease.save_account(coa, account).await?)
}
