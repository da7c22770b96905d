use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::TransitionError;
use super::common::{deserialize_date, deserialize_optional_date, double_option};
use crate::error::AppError;
use crate::utils::validation::require_length;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[serde(alias = "aktif")]
    Active,
    #[serde(alias = "selesai")]
    Completed,
    Resigned,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Resigned => "resigned",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != JobStatus::Active
    }

    /// active → completed / resigned
    pub fn ensure_can_finish(self, target: JobStatus) -> Result<(), TransitionError> {
        if !target.is_terminal() {
            return Err(TransitionError::NotTerminal(target));
        }
        if self.is_terminal() {
            return Err(TransitionError::JobFinished(self));
        }
        Ok(())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "aktif" => Ok(JobStatus::Active),
            "completed" | "selesai" => Ok(JobStatus::Completed),
            "resigned" => Ok(JobStatus::Resigned),
            other => Err(AppError::Validation(format!("unknown job status {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobHistory {
    pub id: i64,
    pub student_id: i64,
    pub company_name: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl JobHistory {
    pub fn finish(&mut self, target: JobStatus, on: NaiveDate) -> Result<(), TransitionError> {
        self.status.ensure_can_finish(target)?;
        self.status = target;
        self.end_date = Some(on);
        Ok(())
    }
}

/// 按 ID 或 NIM 指定学生
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentRef {
    Id(i64),
    Nim(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobHistory {
    pub student_id: Option<i64>,
    pub nim: Option<String>,
    pub company_name: String,
    pub position: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub start_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub end_date: Option<NaiveDate>,
    pub status: Option<JobStatus>,
    pub description: Option<String>,
}

impl CreateJobHistory {
    pub fn student_ref(&self) -> Result<StudentRef, AppError> {
        match (self.student_id, self.nim.as_deref().map(str::trim)) {
            (Some(id), _) => Ok(StudentRef::Id(id)),
            (None, Some(nim)) if !nim.is_empty() => Ok(StudentRef::Nim(nim.to_string())),
            _ => Err(AppError::Validation(
                "either student_id or nim is required".into(),
            )),
        }
    }

    /// 校验字段并得出最终的 (status, end_date)
    pub fn resolve(&self, today: NaiveDate) -> Result<(JobStatus, Option<NaiveDate>), AppError> {
        require_length("company_name", &self.company_name, 1, 100)?;
        require_length("position", &self.position, 1, 100)?;
        if self.start_date > today {
            return Err(AppError::Validation(
                "start_date cannot be in the future".into(),
            ));
        }

        let status = self.status.unwrap_or(JobStatus::Active);
        let end_date = match (status.is_terminal(), self.end_date) {
            (false, Some(_)) => {
                return Err(AppError::Validation(
                    "an active job cannot have an end_date".into(),
                ));
            }
            (false, None) => None,
            (true, Some(end)) => Some(end),
            (true, None) => Some(today),
        };
        if let Some(end) = end_date {
            if end < self.start_date {
                return Err(AppError::Validation(
                    "end_date cannot be before start_date".into(),
                ));
            }
        }
        Ok((status, end_date))
    }
}

/// 部分更新，状态只能通过 complete/resign 改变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobHistoryUpdate {
    pub company_name: Option<String>,
    pub position: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl JobHistoryUpdate {
    pub fn validate(&self, current: &JobHistory, today: NaiveDate) -> Result<(), AppError> {
        if let Some(company) = &self.company_name {
            require_length("company_name", company, 1, 100)?;
        }
        if let Some(position) = &self.position {
            require_length("position", position, 1, 100)?;
        }
        if self.end_date.is_some() && !current.status.is_terminal() {
            return Err(AppError::InvalidState(
                "end_date can only be changed on a finished job".into(),
            ));
        }
        let start = self.start_date.unwrap_or(current.start_date);
        if self.start_date.is_some() && start > today {
            return Err(AppError::Validation(
                "start_date cannot be in the future".into(),
            ));
        }
        if let Some(end) = self.end_date.or(current.end_date) {
            if end < start {
                return Err(AppError::Validation(
                    "end_date cannot be before start_date".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewJobHistory {
    pub student_id: i64,
    pub company_name: String,
    pub position: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn job(status: JobStatus) -> JobHistory {
        let now = Utc::now();
        JobHistory {
            id: 1,
            student_id: 1,
            company_name: "PT Maju".into(),
            position: "Engineer".into(),
            start_date: date(2024, 1, 1),
            end_date: status.is_terminal().then(|| date(2024, 6, 1)),
            status,
            description: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn create_body(value: serde_json::Value) -> CreateJobHistory {
        serde_json::from_value(value).expect("body")
    }

    #[rstest]
    #[case(JobStatus::Completed)]
    #[case(JobStatus::Resigned)]
    fn finishing_stamps_end_date(#[case] target: JobStatus) {
        let mut job = job(JobStatus::Active);
        job.finish(target, date(2024, 9, 1)).expect("finish");
        assert_eq!(job.status, target);
        assert_eq!(job.end_date, Some(date(2024, 9, 1)));
    }

    #[test]
    fn finished_job_cannot_finish_again() {
        let mut job = job(JobStatus::Completed);
        assert_eq!(
            job.finish(JobStatus::Resigned, date(2025, 1, 1)),
            Err(TransitionError::JobFinished(JobStatus::Completed))
        );
        assert_eq!(job.end_date, Some(date(2024, 6, 1)));
    }

    #[test]
    fn legacy_status_names_are_accepted() {
        let body = create_body(serde_json::json!({
            "nim": "2021001",
            "company_name": "PT Maju",
            "position": "Engineer",
            "start_date": "2024-01-01",
            "status": "selesai"
        }));
        assert_eq!(body.status, Some(JobStatus::Completed));
        assert_eq!(body.student_ref().expect("ref"), StudentRef::Nim("2021001".into()));
    }

    #[test]
    fn terminal_status_without_end_date_uses_today() {
        let body = create_body(serde_json::json!({
            "student_id": 3,
            "company_name": "PT Maju",
            "position": "Engineer",
            "start_date": "2024-01-01T00:00:00Z",
            "status": "resigned"
        }));
        let today = date(2024, 5, 5);
        assert_eq!(
            body.resolve(today).expect("resolve"),
            (JobStatus::Resigned, Some(today))
        );
    }

    #[test]
    fn future_start_date_is_rejected() {
        let body = create_body(serde_json::json!({
            "student_id": 3,
            "company_name": "PT Maju",
            "position": "Engineer",
            "start_date": "2030-01-01"
        }));
        assert!(matches!(
            body.resolve(date(2024, 5, 5)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn active_job_with_end_date_is_rejected() {
        let body = create_body(serde_json::json!({
            "student_id": 3,
            "company_name": "PT Maju",
            "position": "Engineer",
            "start_date": "2024-01-01",
            "end_date": "2024-02-01"
        }));
        assert!(body.resolve(date(2024, 5, 5)).is_err());
    }

    #[test]
    fn missing_student_reference_is_rejected() {
        let body = create_body(serde_json::json!({
            "nim": "  ",
            "company_name": "PT Maju",
            "position": "Engineer",
            "start_date": "2024-01-01"
        }));
        assert!(body.student_ref().is_err());
    }

    #[test]
    fn update_distinguishes_null_from_absent_description() {
        let absent: JobHistoryUpdate = serde_json::from_value(serde_json::json!({})).expect("body");
        assert_eq!(absent.description, None);

        let cleared: JobHistoryUpdate =
            serde_json::from_value(serde_json::json!({"description": null})).expect("body");
        assert_eq!(cleared.description, Some(None));
    }

    #[test]
    fn end_date_change_requires_finished_job() {
        let update = JobHistoryUpdate {
            end_date: Some(date(2024, 7, 1)),
            ..Default::default()
        };
        assert!(matches!(
            update.validate(&job(JobStatus::Active), date(2024, 8, 1)),
            Err(AppError::InvalidState(_))
        ));
        assert!(update.validate(&job(JobStatus::Completed), date(2024, 8, 1)).is_ok());
    }
}
