//! Postgres 存储库集成测试。
//!
//! 设置 `TEST_DATABASE_URL` 时使用已有服务器，否则启动一个嵌入式 PostgreSQL。
//! 每个测试都在独立的新数据库上运行迁移。无法启动集群时测试被跳过，
//! 设置 `REQUIRE_TEST_CLUSTER=1` 则改为失败。

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use alumni_backend::database::{
    self, AdminOperation, AdminRepository, JobHistoryOperation, JobHistoryRepository,
    RepositoryError, StudentOperation, StudentRepository,
};
use alumni_backend::models::{
    AdminRole, Graduation, JobFilter, JobStatus, NewAdmin, NewJobHistory, NewStudent,
    StudentChanges, StudentFilter, StudentStatus,
};
use chrono::NaiveDate;
use postgresql_embedded::PostgreSQL;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::OnceCell;

static CLUSTER: OnceCell<Result<PgConnectOptions, String>> = OnceCell::const_new();
static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

async fn start_cluster() -> Result<PgConnectOptions, String> {
    if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
        return PgConnectOptions::from_str(&url).map_err(|e| e.to_string());
    }

    let mut postgres = PostgreSQL::default();
    postgres
        .setup()
        .await
        .map_err(|e| format!("embedded postgres setup failed: {e}"))?;
    postgres
        .start()
        .await
        .map_err(|e| format!("embedded postgres start failed: {e}"))?;
    let admin = PgConnectOptions::from_str(&postgres.settings().url("postgres"))
        .map_err(|e| e.to_string())?;
    // 集群在整个测试进程内保持运行
    std::mem::forget(postgres);
    Ok(admin)
}

fn require_cluster() -> bool {
    std::env::var("REQUIRE_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// 新建一个已迁移的空数据库；集群不可用时返回 None
async fn fresh_pool() -> Option<PgPool> {
    let cluster = match CLUSTER.get_or_init(start_cluster).await {
        Ok(admin) => admin,
        Err(reason) if require_cluster() => panic!("Test cluster setup failed: {reason}"),
        Err(reason) => {
            eprintln!("SKIP-TEST-CLUSTER: {reason}");
            return None;
        }
    };

    let name = format!(
        "alumni_test_{}_{}",
        std::process::id(),
        NEXT_DATABASE.fetch_add(1, Ordering::Relaxed)
    );
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(cluster.clone())
        .await
        .expect("connect to cluster");
    sqlx::query(&format!("CREATE DATABASE \"{name}\""))
        .execute(&admin)
        .await
        .expect("create test database");
    admin.close().await;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(cluster.clone().database(&name))
        .await
        .expect("connect to test database");
    database::migrate(&pool).await.expect("migrate");
    Some(pool)
}

struct Repos {
    pool: PgPool,
    students: StudentOperation,
    jobs: JobHistoryOperation,
    admins: AdminOperation,
}

async fn repos() -> Option<Repos> {
    let pool = fresh_pool().await?;
    Some(Repos {
        students: StudentOperation::new(pool.clone()),
        jobs: JobHistoryOperation::new(pool.clone()),
        admins: AdminOperation::new(pool.clone()),
        pool,
    })
}

fn new_student(nim: &str, name: &str) -> NewStudent {
    NewStudent {
        nim: nim.into(),
        name: name.into(),
        department: "Informatika".into(),
        entry_year: 2020,
        email: format!("{nim}@campus.ac.id"),
        password_hash: "$2b$04$placeholder".into(),
        graduation: None,
    }
}

fn graduation(year: i32, phone: &str) -> Graduation {
    Graduation {
        graduation_year: year,
        phone: phone.into(),
        address: "Jakarta".into(),
    }
}

fn new_job(student_id: i64) -> NewJobHistory {
    NewJobHistory {
        student_id,
        company_name: "PT Maju Jaya".into(),
        position: "Backend Engineer".into(),
        start_date: NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"),
        end_date: None,
        status: JobStatus::Active,
        description: Some("Payments team".into()),
    }
}

async fn job_rows(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM job_histories")
        .fetch_one(pool)
        .await
        .expect("count")
}

fn search(term: &str) -> StudentFilter {
    StudentFilter {
        search: Some(term.into()),
        status: None,
        limit: 10,
        offset: 0,
    }
}

#[tokio::test]
async fn graduating_twice_keeps_the_first_graduation() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020001", "John Doe"))
        .await
        .expect("create");
    assert_eq!(student.status, StudentStatus::Active);
    assert!(student.graduation_year.is_none());

    let graduated = repos
        .students
        .graduate(student.id, &graduation(2024, "081111"))
        .await
        .expect("graduate")
        .expect("active student graduates");
    assert_eq!(graduated.status, StudentStatus::Graduated);

    let second = repos
        .students
        .graduate(student.id, &graduation(2025, "082222"))
        .await
        .expect("graduate again");
    assert!(second.is_none());

    let stored = repos
        .students
        .find_by_id(student.id)
        .await
        .expect("find")
        .expect("row");
    assert_eq!(stored.graduation_year, Some(2024));
    assert_eq!(stored.phone.as_deref(), Some("081111"));
}

#[tokio::test]
async fn alumni_fields_are_not_written_to_active_students() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020002", "Jane Doe"))
        .await
        .expect("create");

    let changes = StudentChanges {
        name: Some("Jane Smith".into()),
        phone: Some("089999".into()),
        ..Default::default()
    };
    let updated = repos.students.update(student.id, &changes).await.expect("update");
    assert!(updated.is_none());

    let stored = repos
        .students
        .find_by_id(student.id)
        .await
        .expect("find")
        .expect("row");
    assert_eq!(stored.name, "Jane Doe");
    assert!(stored.phone.is_none());
}

#[tokio::test]
async fn job_for_non_graduated_student_inserts_nothing() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020003", "John Doe"))
        .await
        .expect("create");

    let created = repos.jobs.create(new_job(student.id)).await.expect("create job");
    assert!(created.is_none());
    assert_eq!(job_rows(&repos.pool).await, 0);

    repos
        .students
        .graduate(student.id, &graduation(2024, "081111"))
        .await
        .expect("graduate");
    let created = repos.jobs.create(new_job(student.id)).await.expect("create job");
    assert!(created.is_some());
    assert_eq!(job_rows(&repos.pool).await, 1);
}

#[tokio::test]
async fn finishing_a_job_happens_once() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020004", "John Doe"))
        .await
        .expect("create");
    repos
        .students
        .graduate(student.id, &graduation(2024, "081111"))
        .await
        .expect("graduate");
    let job = repos
        .jobs
        .create(new_job(student.id))
        .await
        .expect("create job")
        .expect("row");

    let completed = repos
        .jobs
        .finish(job.id, JobStatus::Completed)
        .await
        .expect("finish")
        .expect("active job finishes");
    assert_eq!(completed.status, JobStatus::Completed);
    assert!(completed.end_date.is_some());

    let again = repos
        .jobs
        .finish(job.id, JobStatus::Resigned)
        .await
        .expect("finish again");
    assert!(again.is_none());

    let stored = repos
        .jobs
        .find_by_id(job.id)
        .await
        .expect("find")
        .expect("row");
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.end_date, completed.end_date);
}

#[tokio::test]
async fn deleting_a_student_hides_their_jobs() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020005", "John Doe"))
        .await
        .expect("create");
    repos
        .students
        .graduate(student.id, &graduation(2024, "081111"))
        .await
        .expect("graduate");
    let job = repos
        .jobs
        .create(new_job(student.id))
        .await
        .expect("create job")
        .expect("row");

    assert!(repos.students.soft_delete(student.id).await.expect("delete"));
    assert!(!repos.students.soft_delete(student.id).await.expect("delete again"));

    assert!(repos.students.find_by_id(student.id).await.expect("find").is_none());
    assert!(repos.jobs.find_by_id(job.id).await.expect("find job").is_none());
    assert!(
        repos
            .jobs
            .list_by_student(student.id)
            .await
            .expect("list")
            .is_empty()
    );
    let page = repos
        .jobs
        .search(&JobFilter {
            limit: 10,
            ..Default::default()
        })
        .await
        .expect("search");
    assert_eq!(page.total, 0);

    let tombstones: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM job_histories WHERE deleted_at IS NOT NULL")
            .fetch_one(&repos.pool)
            .await
            .expect("count");
    assert_eq!(tombstones, 1);
}

#[tokio::test]
async fn duplicate_live_identities_are_reported_by_field() {
    let Some(repos) = repos().await else { return };
    let first = repos
        .students
        .create(new_student("2020006", "John Doe"))
        .await
        .expect("create");

    let same_nim = NewStudent {
        email: "other@campus.ac.id".into(),
        ..new_student("2020006", "Other")
    };
    assert!(matches!(
        repos.students.create(same_nim).await,
        Err(RepositoryError::Duplicate { field: "nim" })
    ));

    let same_email = NewStudent {
        email: first.email.clone(),
        ..new_student("2020007", "Other")
    };
    assert!(matches!(
        repos.students.create(same_email).await,
        Err(RepositoryError::Duplicate { field: "email" })
    ));

    let renamed = StudentChanges {
        nim: Some("2020006".into()),
        ..Default::default()
    };
    let second = repos
        .students
        .create(new_student("2020008", "Jane Doe"))
        .await
        .expect("create");
    assert!(matches!(
        repos.students.update(second.id, &renamed).await,
        Err(RepositoryError::Duplicate { field: "nim" })
    ));

    // 软删除后可重新使用
    repos.students.soft_delete(first.id).await.expect("delete");
    repos
        .students
        .create(new_student("2020006", "John Again"))
        .await
        .expect("nim is free again");
}

#[tokio::test]
async fn duplicate_admin_username_is_reported() {
    let Some(repos) = repos().await else { return };
    let admin = |username: &str, email: &str| NewAdmin {
        username: username.into(),
        email: email.into(),
        password_hash: "$2b$04$placeholder".into(),
        role: AdminRole::Moderator,
        is_active: true,
    };
    repos
        .admins
        .create(admin("operator", "op@campus.ac.id"))
        .await
        .expect("create");

    assert!(matches!(
        repos.admins.create(admin("operator", "other@campus.ac.id")).await,
        Err(RepositoryError::Duplicate { field: "username" })
    ));
    assert!(matches!(
        repos.admins.create(admin("second", "op@campus.ac.id")).await,
        Err(RepositoryError::Duplicate { field: "email" })
    ));
}

#[tokio::test]
async fn search_treats_like_wildcards_literally() {
    let Some(repos) = repos().await else { return };
    for (nim, name) in [
        ("2020010", "Budi 100% Lulus"),
        ("2020011", "Budi 1000 Lulus"),
        ("2020012", "Siti_Aminah"),
        ("2020013", "SitiXAminah"),
    ] {
        repos
            .students
            .create(new_student(nim, name))
            .await
            .expect("create");
    }

    let percent = repos.students.search(&search("%")).await.expect("search");
    assert_eq!(percent.total, 1);
    assert_eq!(percent.items[0].name, "Budi 100% Lulus");

    let underscore = repos.students.search(&search("i_a")).await.expect("search");
    assert_eq!(underscore.total, 1);
    assert_eq!(underscore.items[0].name, "Siti_Aminah");

    let insensitive = repos.students.search(&search("budi")).await.expect("search");
    assert_eq!(insensitive.total, 2);
}

#[tokio::test]
async fn schema_rejects_inconsistent_rows() {
    let Some(repos) = repos().await else { return };
    let student = repos
        .students
        .create(new_student("2020020", "John Doe"))
        .await
        .expect("create");

    let graduated_without_fields =
        sqlx::query("UPDATE students SET status = 'graduated' WHERE id = $1")
            .bind(student.id)
            .execute(&repos.pool)
            .await;
    assert!(graduated_without_fields.is_err());

    let unknown_status = sqlx::query("UPDATE students SET status = 'expelled' WHERE id = $1")
        .bind(student.id)
        .execute(&repos.pool)
        .await;
    assert!(unknown_status.is_err());

    repos
        .students
        .graduate(student.id, &graduation(2024, "081111"))
        .await
        .expect("graduate");

    let active_with_end_date = sqlx::query(
        "INSERT INTO job_histories (student_id, company_name, position, start_date, end_date, status) \
         VALUES ($1, 'Acme', 'Engineer', DATE '2024-01-01', DATE '2024-06-01', 'active')",
    )
    .bind(student.id)
    .execute(&repos.pool)
    .await;
    assert!(active_with_end_date.is_err());

    let ends_before_start = sqlx::query(
        "INSERT INTO job_histories (student_id, company_name, position, start_date, end_date, status) \
         VALUES ($1, 'Acme', 'Engineer', DATE '2024-06-01', DATE '2024-01-01', 'completed')",
    )
    .bind(student.id)
    .execute(&repos.pool)
    .await;
    assert!(ends_before_start.is_err());
    assert_eq!(job_rows(&repos.pool).await, 0);
}
