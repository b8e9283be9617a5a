//! Authorization gate for exports.

use crate::error::ExportError;
use crate::store::{Store, TableQuery};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde_json::Value;
use tracing::debug;

const MEMBERSHIP_TABLE: &str = "org_members";

/// The caller's bearer credentials as presented on the request.
#[derive(Debug, Clone)]
pub struct CallerSession {
    pub access_token: String,
}

impl CallerSession {
    /// Extract `Authorization: Bearer <token>`; absent or malformed → `None`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return None;
        }
        Some(Self {
            access_token: token.to_string(),
        })
    }
}

/// Who is exporting, and in what capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportAccess {
    pub user_id: String,
    pub role: String,
}

/// Confirm the caller has a session and an active membership in `org_id`.
pub async fn assert_can_export(
    store: &dyn Store,
    session: Option<&CallerSession>,
    org_id: &str,
) -> Result<ExportAccess, ExportError> {
    let session = session.ok_or(ExportError::Unauthenticated)?;
    let user_id = store
        .resolve_session(&session.access_token)
        .await?
        .ok_or(ExportError::Unauthenticated)?;

    let query = TableQuery::new(MEMBERSHIP_TABLE)
        .columns("user_id,role")
        .eq("org_id", org_id)
        .eq("user_id", user_id.as_str())
        .eq("is_active", "true")
        .limit(1);
    let membership = store
        .select(&query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ExportError::NoAccess(org_id.to_string()))?;

    let role = membership
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("member")
        .to_string();

    debug!("User {} may export for org {} as {}", user_id, org_id, role);
    Ok(ExportAccess { user_id, role })
}
