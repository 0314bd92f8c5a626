use axum::extract::{Json, Query};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::expiry::{self, ExpiryAssessment, ExpiryPolicy};

#[derive(Deserialize)]
pub struct AssessQuery {
    pub policy: ExpiryPolicy,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub validity_days: Option<i64>,
}

/// Stateless assessment endpoint. Absent dates yield a JSON `null`, never
/// an error, so callers can feed through optional profile fields as-is.
pub async fn assess_expiry(
    Query(params): Query<AssessQuery>,
) -> AppResult<Json<Option<ExpiryAssessment>>> {
    let today = Utc::now().date_naive();

    let assessment = if params.expiry_date.is_some() {
        expiry::assess_until(params.policy, params.expiry_date, today)
    } else {
        match params
            .validity_days
            .or_else(|| params.policy.validity_days())
        {
            Some(validity_days) => {
                if validity_days <= 0 {
                    return Err(AppError::bad_request("validity_days must be positive"));
                }
                expiry::assess_with(params.policy, params.issue_date, validity_days, today)
            }
            None => {
                return Err(AppError::bad_request(
                    "passport assessments need expiry_date or validity_days",
                ))
            }
        }
    };

    Ok(Json(assessment))
}
