// Postgres 存储库实现

mod admin;
mod job_history;
mod student;

pub use admin::AdminOperation;
pub use job_history::JobHistoryOperation;
pub use student::StudentOperation;

use super::RepositoryError;

/// 把搜索词转换为 ILIKE 模式，转义通配符
pub(crate) fn search_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// 唯一约束冲突映射为 Duplicate，并根据约束名确定字段
pub(crate) fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            let field = if constraint.contains("nim") {
                "nim"
            } else if constraint.contains("username") {
                "username"
            } else if constraint.contains("email") {
                "email"
            } else {
                "value"
            };
            return RepositoryError::Duplicate { field };
        }
    }
    RepositoryError::Database(err)
}
