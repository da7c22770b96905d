// 业务服务层：规则校验与状态迁移，存储通过 Repository 接口注入

mod admin;
mod auth;
mod job_history;
mod student;

pub use admin::AdminService;
pub use auth::{AuthService, LoginResponse, Principal};
pub use job_history::JobHistoryService;
pub use student::StudentService;
