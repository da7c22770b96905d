mod handler;

pub use handler::{
    complete_job, create_job, delete_job, get_job, list_jobs, list_jobs_by_alumni, resign_job,
    update_job,
};
