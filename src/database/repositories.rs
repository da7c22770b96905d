use async_trait::async_trait;

use super::RepositoryError;
use crate::models::{
    AdminChanges, AdminUser, Graduation, JobFilter, JobHistory, JobHistoryUpdate, JobStatus,
    NewAdmin, NewJobHistory, NewStudent, Page, Student, StudentChanges, StudentFilter,
};

/// 学生存储库。所有查询都排除已软删除的记录
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, student: NewStudent) -> Result<Student, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Student>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, RepositoryError>;

    async fn find_by_nim(&self, nim: &str) -> Result<Option<Student>, RepositoryError>;

    async fn search(&self, filter: &StudentFilter) -> Result<Page<Student>, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError>;

    /// 仅当状态为 active 时生效，否则返回 None
    async fn graduate(
        &self,
        id: i64,
        graduation: &Graduation,
    ) -> Result<Option<Student>, RepositoryError>;

    /// 同时软删除该学生的工作经历
    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait JobHistoryRepository: Send + Sync {
    /// 仅当学生已毕业时插入，否则返回 None
    async fn create(&self, job: NewJobHistory) -> Result<Option<JobHistory>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<JobHistory>, RepositoryError>;

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<JobHistory>, RepositoryError>;

    async fn search(&self, filter: &JobFilter) -> Result<Page<JobHistory>, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        changes: &JobHistoryUpdate,
    ) -> Result<Option<JobHistory>, RepositoryError>;

    /// 仅当状态为 active 时生效，否则返回 None
    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
    ) -> Result<Option<JobHistory>, RepositoryError>;

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn create(&self, admin: NewAdmin) -> Result<AdminUser, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, RepositoryError>;

    async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<AdminUser>, RepositoryError>;

    async fn update(
        &self,
        id: i64,
        changes: &AdminChanges,
    ) -> Result<Option<AdminUser>, RepositoryError>;

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError>;
}
