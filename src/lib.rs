use std::sync::Arc;

use config::Config;
use database::Repositories;
use services::{AdminService, AuthService, JobHistoryService, StudentService};

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub students: StudentService,
    pub jobs: JobHistoryService,
    pub admins: AdminService,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories) -> Self {
        let config = Arc::new(config);
        let students = StudentService::new(repos.students.clone(), config.bcrypt_cost);
        let jobs = JobHistoryService::new(repos.jobs, repos.students);
        let admins = AdminService::new(repos.admins, config.bcrypt_cost);
        let auth = AuthService::new(students.clone(), admins.clone(), config.clone());

        AppState {
            config,
            students,
            jobs,
            admins,
            auth,
        }
    }
}
