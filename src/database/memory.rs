// 内存存储实现，DB_DRIVER=memory 及测试使用
// 所有跨表操作在同一把锁内完成，语义与 Postgres 实现一致

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{AdminRepository, JobHistoryRepository, RepositoryError, StudentRepository};
use crate::models::{
    AdminChanges, AdminUser, Graduation, JobFilter, JobHistory, JobHistoryUpdate, JobStatus,
    NewAdmin, NewJobHistory, NewStudent, Page, Student, StudentChanges, StudentFilter,
    StudentStatus,
};

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    jobs: Vec<JobHistory>,
    admins: Vec<AdminUser>,
    next_student_id: i64,
    next_job_id: i64,
    next_admin_id: i64,
}

impl Tables {
    fn live_student(&self, id: i64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id && !s.is_deleted())
    }

    fn live_student_mut(&mut self, id: i64) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.id == id && !s.is_deleted())
    }

    fn live_job_mut(&mut self, id: i64) -> Option<&mut JobHistory> {
        self.jobs.iter_mut().find(|j| j.id == id && j.deleted_at.is_none())
    }

    fn live_admin_mut(&mut self, id: i64) -> Option<&mut AdminUser> {
        self.admins.iter_mut().find(|a| a.id == id && a.deleted_at.is_none())
    }

    fn student_conflict(
        &self,
        id: Option<i64>,
        nim: Option<&str>,
        email: Option<&str>,
    ) -> Option<&'static str> {
        let others = self
            .students
            .iter()
            .filter(|s| !s.is_deleted() && Some(s.id) != id);
        for s in others {
            if nim.is_some_and(|nim| s.nim == nim) {
                return Some("nim");
            }
            if email.is_some_and(|email| s.email == email) {
                return Some("email");
            }
        }
        None
    }

    fn admin_conflict(
        &self,
        id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Option<&'static str> {
        let others = self
            .admins
            .iter()
            .filter(|a| a.deleted_at.is_none() && Some(a.id) != id);
        for a in others {
            if username.is_some_and(|username| a.username == username) {
                return Some("username");
            }
            if email.is_some_and(|email| a.email == email) {
                return Some("email");
            }
        }
        None
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 包含已软删除的行，测试用
    pub fn raw_job_count(&self) -> usize {
        self.lock().jobs.len()
    }
}

fn matches_term(term: Option<&str>, fields: &[Option<&str>]) -> bool {
    match term {
        None => true,
        Some(term) => {
            let term = term.to_lowercase();
            fields
                .iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&term))
        }
    }
}

fn paginate<T: Clone>(mut rows: Vec<T>, limit: i64, offset: i64) -> Page<T> {
    let total = rows.len() as i64;
    let start = offset.clamp(0, total) as usize;
    let end = (offset + limit).clamp(0, total) as usize;
    let items = rows.drain(start..end).collect();
    Page { items, total }
}

#[async_trait]
impl StudentRepository for MemoryStore {
    async fn create(&self, student: NewStudent) -> Result<Student, RepositoryError> {
        let mut tables = self.lock();
        let conflict =
            tables.student_conflict(None, Some(student.nim.as_str()), Some(student.email.as_str()));
        if let Some(field) = conflict {
            return Err(RepositoryError::Duplicate { field });
        }

        tables.next_student_id += 1;
        let now = Utc::now();
        let graduation = student.graduation;
        let created = Student {
            id: tables.next_student_id,
            nim: student.nim,
            name: student.name,
            department: student.department,
            entry_year: student.entry_year,
            email: student.email,
            password_hash: student.password_hash,
            status: if graduation.is_some() {
                StudentStatus::Graduated
            } else {
                StudentStatus::Active
            },
            graduation_year: graduation.as_ref().map(|g| g.graduation_year),
            phone: graduation.as_ref().map(|g| g.phone.trim().to_string()),
            address: graduation.as_ref().map(|g| g.address.trim().to_string()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.students.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Student>, RepositoryError> {
        Ok(self.lock().live_student(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Student>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .students
            .iter()
            .find(|s| s.email == email && !s.is_deleted())
            .cloned())
    }

    async fn find_by_nim(&self, nim: &str) -> Result<Option<Student>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .students
            .iter()
            .find(|s| s.nim == nim && !s.is_deleted())
            .cloned())
    }

    async fn search(&self, filter: &StudentFilter) -> Result<Page<Student>, RepositoryError> {
        let tables = self.lock();
        let mut rows: Vec<Student> = tables
            .students
            .iter()
            .filter(|s| !s.is_deleted())
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .filter(|s| {
                matches_term(
                    filter.search.as_deref(),
                    &[
                        Some(s.nim.as_str()),
                        Some(s.name.as_str()),
                        Some(s.department.as_str()),
                        Some(s.email.as_str()),
                    ],
                )
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(paginate(rows, filter.limit, filter.offset))
    }

    async fn update(
        &self,
        id: i64,
        changes: &StudentChanges,
    ) -> Result<Option<Student>, RepositoryError> {
        let mut tables = self.lock();
        match tables.live_student(id) {
            None => return Ok(None),
            Some(s) if changes.touches_alumni_fields() && !s.is_alumni() => return Ok(None),
            Some(_) => {}
        }
        if let Some(field) =
            tables.student_conflict(Some(id), changes.nim.as_deref(), changes.email.as_deref())
        {
            return Err(RepositoryError::Duplicate { field });
        }

        let Some(student) = tables.live_student_mut(id) else {
            return Ok(None);
        };
        if let Some(nim) = &changes.nim {
            student.nim = nim.clone();
        }
        if let Some(name) = &changes.name {
            student.name = name.clone();
        }
        if let Some(department) = &changes.department {
            student.department = department.clone();
        }
        if let Some(year) = changes.entry_year {
            student.entry_year = year;
        }
        if let Some(email) = &changes.email {
            student.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            student.password_hash = hash.clone();
        }
        if let Some(year) = changes.graduation_year {
            student.graduation_year = Some(year);
        }
        if let Some(phone) = &changes.phone {
            student.phone = Some(phone.clone());
        }
        if let Some(address) = &changes.address {
            student.address = Some(address.clone());
        }
        student.updated_at = Utc::now();
        Ok(Some(student.clone()))
    }

    async fn graduate(
        &self,
        id: i64,
        graduation: &Graduation,
    ) -> Result<Option<Student>, RepositoryError> {
        let mut tables = self.lock();
        let Some(student) = tables.live_student_mut(id) else {
            return Ok(None);
        };
        match student.graduate(graduation, Utc::now()) {
            Ok(()) => Ok(Some(student.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let Some(student) = tables.live_student_mut(id) else {
            return Ok(false);
        };
        student.deleted_at = Some(now);
        student.updated_at = now;
        for job in tables
            .jobs
            .iter_mut()
            .filter(|j| j.student_id == id && j.deleted_at.is_none())
        {
            job.deleted_at = Some(now);
            job.updated_at = now;
        }
        Ok(true)
    }
}

#[async_trait]
impl JobHistoryRepository for MemoryStore {
    async fn create(&self, job: NewJobHistory) -> Result<Option<JobHistory>, RepositoryError> {
        let mut tables = self.lock();
        if !tables.live_student(job.student_id).is_some_and(Student::is_alumni) {
            return Ok(None);
        }

        tables.next_job_id += 1;
        let now = Utc::now();
        let created = JobHistory {
            id: tables.next_job_id,
            student_id: job.student_id,
            company_name: job.company_name,
            position: job.position,
            start_date: job.start_date,
            end_date: job.end_date,
            status: job.status,
            description: job.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.jobs.push(created.clone());
        Ok(Some(created))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<JobHistory>, RepositoryError> {
        Ok(self.lock().live_job_mut(id).map(|job| job.clone()))
    }

    async fn list_by_student(&self, student_id: i64) -> Result<Vec<JobHistory>, RepositoryError> {
        let tables = self.lock();
        let mut jobs: Vec<JobHistory> = tables
            .jobs
            .iter()
            .filter(|j| j.student_id == student_id && j.deleted_at.is_none())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(jobs)
    }

    async fn search(&self, filter: &JobFilter) -> Result<Page<JobHistory>, RepositoryError> {
        let tables = self.lock();
        let mut rows: Vec<JobHistory> = tables
            .jobs
            .iter()
            .filter(|j| j.deleted_at.is_none())
            .filter(|j| filter.status.is_none_or(|status| j.status == status))
            .filter(|j| {
                matches_term(
                    filter.search.as_deref(),
                    &[
                        Some(j.company_name.as_str()),
                        Some(j.position.as_str()),
                        Some(j.status.as_str()),
                        j.description.as_deref(),
                    ],
                )
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(paginate(rows, filter.limit, filter.offset))
    }

    async fn update(
        &self,
        id: i64,
        changes: &JobHistoryUpdate,
    ) -> Result<Option<JobHistory>, RepositoryError> {
        let mut tables = self.lock();
        let Some(job) = tables.live_job_mut(id) else {
            return Ok(None);
        };
        if let Some(company) = &changes.company_name {
            job.company_name = company.clone();
        }
        if let Some(position) = &changes.position {
            job.position = position.clone();
        }
        if let Some(start) = changes.start_date {
            job.start_date = start;
        }
        if let Some(end) = changes.end_date {
            if job.status.is_terminal() {
                job.end_date = Some(end);
            }
        }
        if let Some(description) = &changes.description {
            job.description = description.clone();
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
    ) -> Result<Option<JobHistory>, RepositoryError> {
        let mut tables = self.lock();
        let Some(job) = tables.live_job_mut(id) else {
            return Ok(None);
        };
        let now = Utc::now();
        match job.finish(status, now.date_naive()) {
            Ok(()) => {
                job.updated_at = now;
                Ok(Some(job.clone()))
            }
            Err(_) => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let Some(job) = tables.live_job_mut(id) else {
            return Ok(false);
        };
        let now = Utc::now();
        job.deleted_at = Some(now);
        job.updated_at = now;
        Ok(true)
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn create(&self, admin: NewAdmin) -> Result<AdminUser, RepositoryError> {
        let mut tables = self.lock();
        let conflict =
            tables.admin_conflict(None, Some(admin.username.as_str()), Some(admin.email.as_str()));
        if let Some(field) = conflict {
            return Err(RepositoryError::Duplicate { field });
        }

        tables.next_admin_id += 1;
        let now = Utc::now();
        let created = AdminUser {
            id: tables.next_admin_id,
            username: admin.username,
            email: admin.email,
            password_hash: admin.password_hash,
            role: admin.role,
            is_active: admin.is_active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.admins.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AdminUser>, RepositoryError> {
        Ok(self.lock().live_admin_mut(id).map(|admin| admin.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .admins
            .iter()
            .find(|a| a.username == username && a.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, RepositoryError> {
        let tables = self.lock();
        Ok(tables
            .admins
            .iter()
            .find(|a| a.email == email && a.deleted_at.is_none())
            .cloned())
    }

    async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Page<AdminUser>, RepositoryError> {
        let tables = self.lock();
        let mut rows: Vec<AdminUser> = tables
            .admins
            .iter()
            .filter(|a| a.deleted_at.is_none())
            .filter(|a| {
                matches_term(
                    search,
                    &[Some(a.username.as_str()), Some(a.email.as_str()), Some(a.role.as_str())],
                )
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(paginate(rows, limit, offset))
    }

    async fn update(
        &self,
        id: i64,
        changes: &AdminChanges,
    ) -> Result<Option<AdminUser>, RepositoryError> {
        let mut tables = self.lock();
        if tables.live_admin_mut(id).is_none() {
            return Ok(None);
        }
        if let Some(field) =
            tables.admin_conflict(Some(id), changes.username.as_deref(), changes.email.as_deref())
        {
            return Err(RepositoryError::Duplicate { field });
        }

        let Some(admin) = tables.live_admin_mut(id) else {
            return Ok(None);
        };
        if let Some(username) = &changes.username {
            admin.username = username.clone();
        }
        if let Some(email) = &changes.email {
            admin.email = email.clone();
        }
        if let Some(hash) = &changes.password_hash {
            admin.password_hash = hash.clone();
        }
        if let Some(role) = changes.role {
            admin.role = role;
        }
        if let Some(active) = changes.is_active {
            admin.is_active = active;
        }
        admin.updated_at = Utc::now();
        Ok(Some(admin.clone()))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        let Some(admin) = tables.live_admin_mut(id) else {
            return Ok(false);
        };
        let now = Utc::now();
        admin.deleted_at = Some(now);
        admin.updated_at = now;
        Ok(true)
    }
}
