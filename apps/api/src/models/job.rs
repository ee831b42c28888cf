use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const JOB_STATUS_OPEN: &str = "open";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub customer_id: String,
    pub customer_name: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub budget: f64,
    pub preferred_date: Option<NaiveDate>,
    pub status: String,
    pub posted_at: DateTime<Utc>,
}
