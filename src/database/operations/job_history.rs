use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::search_pattern;
use crate::database::{JobHistoryRepository, RepositoryError};
use crate::models::{JobFilter, JobHistory, JobHistoryUpdate, JobStatus, NewJobHistory, Page};

const JOB_COLUMNS: &str = "id, student_id, company_name, position, start_date, end_date, \
     status, description, created_at, updated_at, deleted_at";

const SEARCH_CONDITION: &str = "deleted_at IS NULL \
     AND ($1::text IS NULL OR status = $1) \
     AND ($2::text IS NULL OR company_name ILIKE $2 OR position ILIKE $2 \
          OR status ILIKE $2 OR description ILIKE $2)";

/// 工作经历存储库
pub struct JobHistoryOperation {
    db: PgPool,
}

impl JobHistoryOperation {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHistoryRepository for JobHistoryOperation {
    async fn create(&self, job: NewJobHistory) -> Result<Option<JobHistory>, RepositoryError> {
        // 学生必须在插入时仍处于 graduated 状态
        let sql = format!(
            r#"
            INSERT INTO job_histories (student_id, company_name, position, start_date,
                                       end_date, status, description)
            SELECT s.id, $2, $3, $4, $5, $6, $7
            FROM students s
            WHERE s.id = $1 AND s.status = 'graduated' AND s.deleted_at IS NULL
            RETURNING {JOB_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(job.student_id)
            .bind(&job.company_name)
            .bind(&job.position)
            .bind(job.start_date)
            .bind(job.end_date)
            .bind(job.status)
            .bind(job.description.as_deref())
            .fetch_optional(&self.db)
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<JobHistory>, RepositoryError> {
        let sql =
            format!("SELECT {JOB_COLUMNS} FROM job_histories WHERE id = $1 AND deleted_at IS NULL");
        let job = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(job)
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<JobHistory>, RepositoryError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM job_histories \
             WHERE student_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        );
        let jobs = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(student_id)
            .fetch_all(&self.db)
            .await?;
        Ok(jobs)
    }

    async fn search(&self, filter: &JobFilter) -> Result<Page<JobHistory>, RepositoryError> {
        let pattern = filter.search.as_deref().map(search_pattern);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM job_histories WHERE {SEARCH_CONDITION}"
        ))
        .bind(filter.status)
        .bind(pattern.as_deref())
        .fetch_one(&self.db)
        .await?;

        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM job_histories WHERE {SEARCH_CONDITION} \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(filter.status)
            .bind(pattern.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.db)
            .await?;

        Ok(Page { items, total })
    }

    async fn update(
        &self,
        id: i64,
        changes: &JobHistoryUpdate,
    ) -> Result<Option<JobHistory>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE job_histories SET
                company_name = COALESCE($2, company_name),
                position = COALESCE($3, position),
                start_date = COALESCE($4, start_date),
                end_date = CASE WHEN status = 'active' THEN end_date ELSE COALESCE($5, end_date) END,
                description = CASE WHEN $6 THEN $7 ELSE description END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {JOB_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(id)
            .bind(changes.company_name.as_deref())
            .bind(changes.position.as_deref())
            .bind(changes.start_date)
            .bind(changes.end_date)
            .bind(changes.description.is_some())
            .bind(changes.description.clone().flatten())
            .fetch_optional(&self.db)
            .await?;
        Ok(updated)
    }

    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
    ) -> Result<Option<JobHistory>, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE job_histories SET
                status = $2,
                end_date = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND deleted_at IS NULL
            RETURNING {JOB_COLUMNS}
            "#
        );
        let finished = sqlx::query_as::<_, JobHistory>(&sql)
            .bind(id)
            .bind(status)
            .bind(Utc::now().date_naive())
            .fetch_optional(&self.db)
            .await?;
        Ok(finished)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE job_histories SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
