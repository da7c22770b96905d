use std::sync::Arc;

use chrono::Utc;

use crate::database::{JobHistoryRepository, StudentRepository};
use crate::error::AppError;
use crate::models::{
    CreateJobHistory, JobFilter, JobHistory, JobHistoryUpdate, JobStatus, NewJobHistory, Page,
    PageRequest, Student, StudentRef,
};

/// 校友工作经历服务
#[derive(Clone)]
pub struct JobHistoryService {
    jobs: Arc<dyn JobHistoryRepository>,
    students: Arc<dyn StudentRepository>,
}

impl JobHistoryService {
    pub fn new(jobs: Arc<dyn JobHistoryRepository>, students: Arc<dyn StudentRepository>) -> Self {
        Self { jobs, students }
    }

    pub async fn resolve_student(&self, student: &StudentRef) -> Result<Student, AppError> {
        let found = match student {
            StudentRef::Id(id) => self.students.find_by_id(*id).await?,
            StudentRef::Nim(nim) => self.students.find_by_nim(nim).await?,
        };
        found.ok_or_else(|| AppError::NotFound("student not found".into()))
    }

    pub async fn create(&self, req: CreateJobHistory) -> Result<JobHistory, AppError> {
        let student = self.resolve_student(&req.student_ref()?).await?;
        let (status, end_date) = req.resolve(Utc::now().date_naive())?;
        if !student.is_alumni() {
            return Err(not_graduated(&student));
        }

        let created = self
            .jobs
            .create(NewJobHistory {
                student_id: student.id,
                company_name: req.company_name.trim().to_string(),
                position: req.position.trim().to_string(),
                start_date: req.start_date,
                end_date,
                status,
                description: clean_description(req.description),
            })
            .await?;

        // 插入时学生已不再是毕业状态
        let job = created.ok_or_else(|| not_graduated(&student))?;
        tracing::info!(
            "Created job history {} for student {} at {}",
            job.id,
            job.student_id,
            job.company_name
        );
        Ok(job)
    }

    pub async fn get(&self, id: i64) -> Result<JobHistory, AppError> {
        self.jobs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("job history not found".into()))
    }

    pub async fn list_by_student(&self, student_id: i64) -> Result<Vec<JobHistory>, AppError> {
        if self.students.find_by_id(student_id).await?.is_none() {
            return Err(AppError::NotFound("student not found".into()));
        }
        Ok(self.jobs.list_by_student(student_id).await?)
    }

    pub async fn search(
        &self,
        page: &PageRequest,
        status: Option<JobStatus>,
    ) -> Result<Page<JobHistory>, AppError> {
        let filter = JobFilter {
            search: page.search.clone(),
            status,
            limit: i64::from(page.limit),
            offset: page.offset(),
        };
        Ok(self.jobs.search(&filter).await?)
    }

    pub async fn update(&self, id: i64, req: JobHistoryUpdate) -> Result<JobHistory, AppError> {
        let current = self.get(id).await?;
        req.validate(&current, Utc::now().date_naive())?;

        let changes = JobHistoryUpdate {
            company_name: req.company_name.map(|c| c.trim().to_string()),
            position: req.position.map(|p| p.trim().to_string()),
            description: req.description.map(clean_description),
            ..req
        };
        let job = self
            .jobs
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("job history not found".into()))?;

        tracing::info!("Updated job history {}", job.id);
        Ok(job)
    }

    pub async fn complete(&self, id: i64) -> Result<JobHistory, AppError> {
        self.finish(id, JobStatus::Completed).await
    }

    pub async fn resign(&self, id: i64) -> Result<JobHistory, AppError> {
        self.finish(id, JobStatus::Resigned).await
    }

    async fn finish(&self, id: i64, target: JobStatus) -> Result<JobHistory, AppError> {
        match self.jobs.finish(id, target).await? {
            Some(job) => {
                tracing::info!("Job history {} is now {}", job.id, job.status);
                Ok(job)
            }
            None => {
                let current = self.get(id).await?;
                current.status.ensure_can_finish(target)?;
                Err(AppError::InvalidState(format!(
                    "job history {id} could not be marked {target}"
                )))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.jobs.soft_delete(id).await? {
            return Err(AppError::NotFound("job history not found".into()));
        }
        tracing::info!("Soft-deleted job history {}", id);
        Ok(())
    }
}

// 空白描述按未填写处理
fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn not_graduated(student: &Student) -> AppError {
    AppError::NotGraduated(format!(
        "student {} has not graduated (status {})",
        student.nim, student.status
    ))
}
