use async_trait::async_trait;
use sqlx::PgPool;

use super::{map_write_error, search_pattern};
use crate::database::{RepositoryError, StudentRepository};
use crate::models::{
    Graduation, NewStudent, Page, Student, StudentChanges, StudentFilter, StudentStatus,
};

const STUDENT_COLUMNS: &str = "id, nim, name, department, entry_year, email, password_hash, \
     status, graduation_year, phone, address, created_at, updated_at, deleted_at";

const SEARCH_CONDITION: &str = "deleted_at IS NULL \
     AND ($1::text IS NULL OR status = $1) \
     AND ($2::text IS NULL OR nim ILIKE $2 OR name ILIKE $2 OR department ILIKE $2 OR email ILIKE $2)";

/// 学生存储库，处理 students 表的所有操作
pub struct StudentOperation {
    db: PgPool,
}

impl StudentOperation {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Student>, RepositoryError> {
        let sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE {column} = $1 AND deleted_at IS NULL"
        );
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(student)
    }
}

#[async_trait]
impl StudentRepository for StudentOperation {
    async fn create(&self, student: NewStudent) -> Result<Student, RepositoryError> {
        let status = match student.graduation {
            Some(_) => StudentStatus::Graduated,
            None => StudentStatus::Active,
        };
        let graduation = student.graduation.as_ref();

        let sql = format!(
            r#"
            INSERT INTO students (nim, name, department, entry_year, email, password_hash,
                                  status, graduation_year, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Student>(&sql)
            .bind(&student.nim)
            .bind(&student.name)
            .bind(&student.department)
            .bind(student.entry_year)
            .bind(&student.email)
            .bind(&student.password_hash)
            .bind(status)
            .bind(graduation.map(|g| g.graduation_year))
            .bind(graduation.map(|g| g.phone.as_str()))
            .bind(graduation.map(|g| g.address.as_str()))
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)?;

        tracing::debug!("Inserted student row {}", created.id);
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Student>, RepositoryError> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 AND deleted_at IS NULL");
        let student = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(student)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, RepositoryError> {
        self.find_one("email", email).await
    }

    async fn find_by_nim(&self, nim: &str) -> Result<Option<Student>, RepositoryError> {
        self.find_one("nim", nim).await
    }

    async fn search(&self, filter: &StudentFilter) -> Result<Page<Student>, RepositoryError> {
        let pattern = filter.search.as_deref().map(search_pattern);

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM students WHERE {SEARCH_CONDITION}"))
                .bind(filter.status)
                .bind(pattern.as_deref())
                .fetch_one(&self.db)
                .await?;

        let sql = format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE {SEARCH_CONDITION} \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Student>(&sql)
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
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError> {
        // 校友字段只允许写入已毕业的记录
        let sql = format!(
            r#"
            UPDATE students SET
                nim = COALESCE($2, nim),
                name = COALESCE($3, name),
                department = COALESCE($4, department),
                entry_year = COALESCE($5, entry_year),
                email = COALESCE($6, email),
                password_hash = COALESCE($7, password_hash),
                graduation_year = COALESCE($8, graduation_year),
                phone = COALESCE($9, phone),
                address = COALESCE($10, address),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
              AND (NOT $11 OR status = 'graduated')
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .bind(changes.nim.as_deref())
            .bind(changes.name.as_deref())
            .bind(changes.department.as_deref())
            .bind(changes.entry_year)
            .bind(changes.email.as_deref())
            .bind(changes.password_hash.as_deref())
            .bind(changes.graduation_year)
            .bind(changes.phone.as_deref())
            .bind(changes.address.as_deref())
            .bind(changes.touches_alumni_fields())
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)?;
        Ok(updated)
    }

    async fn graduate(
        &self,
        id: i64,
        graduation: &Graduation,
    ) -> Result<Option<Student>, RepositoryError> {
        // 条件更新：检查与写入在同一条语句中完成
        let sql = format!(
            r#"
            UPDATE students SET
                status = 'graduated',
                graduation_year = $2,
                phone = $3,
                address = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND deleted_at IS NULL
            RETURNING {STUDENT_COLUMNS}
            "#
        );
        let graduated = sqlx::query_as::<_, Student>(&sql)
            .bind(id)
            .bind(graduation.graduation_year)
            .bind(graduation.phone.trim())
            .bind(graduation.address.trim())
            .fetch_optional(&self.db)
            .await?;
        Ok(graduated)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "UPDATE students SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE job_histories SET deleted_at = NOW(), updated_at = NOW() \
             WHERE student_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
