use chrono::NaiveDate;
use serde::Deserialize;

pub const SERVICE_CATEGORIES: &[&str] = &[
    "Plumbing",
    "Painting",
    "Electrical",
    "Carpentry",
    "Cleaning",
    "General Handyman",
];

const MIN_TITLE_CHARS: usize = 5;
const MIN_DESCRIPTION_CHARS: usize = 20;
const MIN_LOCATION_CHARS: usize = 2;
const MIN_BUDGET: f64 = 1.0;

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJobRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub budget: f64,
    pub preferred_date: Option<NaiveDate>,
}

impl NewJobRequest {
    /// Returns a copy with surrounding whitespace removed from text fields.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            budget: self.budget,
            preferred_date: self.preferred_date,
        }
    }
}

/// Checks every field and reports all failures at once.
pub fn validate_new_job(job: &NewJobRequest) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if job.title.trim().chars().count() < MIN_TITLE_CHARS {
        problems.push(format!("Title must be at least {MIN_TITLE_CHARS} characters."));
    }
    if job.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        problems.push(format!(
            "Description must be at least {MIN_DESCRIPTION_CHARS} characters."
        ));
    }
    if !SERVICE_CATEGORIES.contains(&job.category.trim()) {
        problems.push(format!(
            "Category must be one of: {}.",
            SERVICE_CATEGORIES.join(", ")
        ));
    }
    if job.location.trim().chars().count() < MIN_LOCATION_CHARS {
        problems.push(format!(
            "Location must be at least {MIN_LOCATION_CHARS} characters."
        ));
    }
    // NaN fails this comparison as well.
    if !(job.budget >= MIN_BUDGET) {
        problems.push("Budget must be at least 1.".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NewJobRequest {
        NewJobRequest {
            title: "Fix leaking sink".to_string(),
            description: "Kitchen sink drips constantly under the basin.".to_string(),
            category: "Plumbing".to_string(),
            location: "Springfield".to_string(),
            budget: 120.0,
            preferred_date: None,
        }
    }

    #[test]
    fn test_valid_job_passes() {
        assert!(validate_new_job(&valid()).is_ok());
    }

    #[test]
    fn test_short_fields_are_reported_together() {
        let job = NewJobRequest {
            title: "Fix".to_string(),
            description: "too short".to_string(),
            location: "X".to_string(),
            ..valid()
        };
        let problems = validate_new_job(&job).unwrap_err();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].starts_with("Title"));
        assert!(problems[1].starts_with("Description"));
        assert!(problems[2].starts_with("Location"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let job = NewJobRequest {
            category: "Roofing".to_string(),
            ..valid()
        };
        let problems = validate_new_job(&job).unwrap_err();
        assert!(problems[0].contains("General Handyman"));
    }

    #[test]
    fn test_budget_below_one_rejected() {
        for budget in [0.0, 0.99, -5.0, f64::NAN] {
            let job = NewJobRequest { budget, ..valid() };
            assert!(validate_new_job(&job).is_err(), "budget {budget} accepted");
        }
        let job = NewJobRequest { budget: 1.0, ..valid() };
        assert!(validate_new_job(&job).is_ok());
    }

    #[test]
    fn test_whitespace_does_not_count_toward_length() {
        let job = NewJobRequest {
            title: "   ab   ".to_string(),
            ..valid()
        };
        assert!(validate_new_job(&job).is_err());
        assert_eq!(valid().trimmed().title, "Fix leaking sink");
    }
}
