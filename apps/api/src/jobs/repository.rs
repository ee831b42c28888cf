use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::identity::Identity;
use crate::jobs::validation::NewJobRequest;
use crate::models::job::{JobRow, JOB_STATUS_OPEN};

pub const ANONYMOUS_CUSTOMER: &str = "Anonymous";

/// Optional filters for the job listing. Blank values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct JobFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

impl JobFilter {
    fn text(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Inserts an already validated job as `open`, posted now.
pub async fn add_job(
    pool: &PgPool,
    customer_id: &Identity,
    customer_name: Option<&str>,
    job: &NewJobRequest,
) -> Result<JobRow> {
    let job = job.trimmed();
    let customer_name = customer_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(ANONYMOUS_CUSTOMER);

    let row = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, customer_id, customer_name, title, description, category,
             location, budget, preferred_date, status, posted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id, customer_id, customer_name, title, description, category,
                  location, budget, preferred_date, status, posted_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer_id.as_str())
    .bind(customer_name)
    .bind(&job.title)
    .bind(&job.description)
    .bind(&job.category)
    .bind(&job.location)
    .bind(job.budget)
    .bind(job.preferred_date)
    .bind(JOB_STATUS_OPEN)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    info!("Job {} posted by {}", row.id, customer_id);
    Ok(row)
}

/// Newest first.
pub async fn list_jobs(pool: &PgPool, filter: &JobFilter) -> Result<Vec<JobRow>> {
    let q = JobFilter::text(&filter.q).map(|q| format!("%{}%", escape_like(&q)));
    let location = JobFilter::text(&filter.location).map(|l| format!("%{}%", escape_like(&l)));
    let category = JobFilter::text(&filter.category);

    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, customer_id, customer_name, title, description, category,
               location, budget, preferred_date, status, posted_at
        FROM jobs
        WHERE ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::text IS NULL OR location ILIKE $3)
        ORDER BY posted_at DESC
        "#,
    )
    .bind(q)
    .bind(category)
    .bind(location)
    .fetch_all(pool)
    .await?)
}

pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, customer_id, customer_name, title, description, category,
               location, budget, preferred_date, status, posted_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Escapes LIKE wildcards so user text matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
