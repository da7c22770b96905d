use thiserror::Error;

use crate::error::AppError;

pub mod admin;
pub mod common;
pub mod job_history;
pub mod student;

pub use admin::{AdminChanges, AdminRole, AdminUpdate, AdminUser, CreateAdmin, NewAdmin};
pub use common::{Page, PageQuery, PageRequest};
pub use job_history::{
    CreateJobHistory, JobFilter, JobHistory, JobHistoryUpdate, JobStatus, NewJobHistory,
    StudentRef,
};
pub use student::{
    AlumniUpdate, Graduation, NewStudent, RegisterAlumni, RegisterStudent, Student,
    StudentChanges, StudentFilter, StudentStatus, StudentUpdate,
};

/// 非法状态迁移
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("student is already graduated")]
    AlreadyGraduated,
    #[error("student with status {0} cannot graduate")]
    StudentNotActive(StudentStatus),
    #[error("job history is already {0}")]
    JobFinished(JobStatus),
    #[error("{0} is not a finishing status")]
    NotTerminal(JobStatus),
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        AppError::InvalidState(err.to_string())
    }
}
