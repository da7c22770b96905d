use std::sync::Arc;

use crate::database::StudentRepository;
use crate::error::AppError;
use crate::models::{
    AlumniUpdate, Graduation, NewStudent, Page, PageRequest, RegisterAlumni, RegisterStudent,
    Student, StudentChanges, StudentFilter, StudentStatus, StudentUpdate,
};
use crate::utils::validation::normalize_email;
use crate::utils::{PasswordVerifier, hash_password};

/// 学生生命周期服务
#[derive(Clone)]
pub struct StudentService {
    repo: Arc<dyn StudentRepository>,
    bcrypt_cost: u32,
    verifier: PasswordVerifier,
}

impl StudentService {
    pub fn new(repo: Arc<dyn StudentRepository>, bcrypt_cost: u32) -> Self {
        Self {
            repo,
            bcrypt_cost,
            verifier: PasswordVerifier::new(bcrypt_cost),
        }
    }

    pub async fn register(&self, req: RegisterStudent) -> Result<Student, AppError> {
        self.create(req, None).await
    }

    /// 直接以 graduated 状态注册校友
    pub async fn register_alumni(&self, req: RegisterAlumni) -> Result<Student, AppError> {
        let (student, graduation) = req.into_parts();
        student.validate()?;
        graduation.validate(student.entry_year)?;
        self.create(student, Some(graduation)).await
    }

    async fn create(
        &self,
        req: RegisterStudent,
        graduation: Option<Graduation>,
    ) -> Result<Student, AppError> {
        req.validate()?;
        let nim = req.nim.trim().to_string();
        let email = normalize_email(&req.email);
        self.ensure_unique(None, Some(&nim), Some(&email)).await?;

        let password_hash = hash_password(&req.password, self.bcrypt_cost)?;
        let student = self
            .repo
            .create(NewStudent {
                nim,
                name: req.name.trim().to_string(),
                department: req.department.trim().to_string(),
                entry_year: req.entry_year,
                email,
                password_hash,
                graduation,
            })
            .await?;

        tracing::info!(
            "Registered student {} (nim {}, status {})",
            student.id,
            student.nim,
            student.status
        );
        Ok(student)
    }

    /// 邮箱不存在与密码错误返回同一个错误
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Student, AppError> {
        let student = self.repo.find_by_email(&normalize_email(email)).await?;
        let hash = student.as_ref().map(|s| s.password_hash.as_str());
        match (self.verifier.verify(password, hash)?, student) {
            (true, Some(student)) => Ok(student),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    pub async fn get(&self, id: i64) -> Result<Student, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("student not found".into()))
    }

    pub async fn get_alumni(&self, id: i64) -> Result<Student, AppError> {
        match self.repo.find_by_id(id).await? {
            Some(student) if student.is_alumni() => Ok(student),
            _ => Err(AppError::NotFound("alumni not found".into())),
        }
    }

    pub async fn search(
        &self,
        page: &PageRequest,
        status: Option<StudentStatus>,
    ) -> Result<Page<Student>, AppError> {
        let filter = StudentFilter {
            search: page.search.clone(),
            status,
            limit: i64::from(page.limit),
            offset: page.offset(),
        };
        Ok(self.repo.search(&filter).await?)
    }

    pub async fn update(&self, id: i64, req: StudentUpdate) -> Result<Student, AppError> {
        let current = self.get(id).await?;
        req.validate()?;
        if let (Some(entry_year), Some(graduation_year)) = (req.entry_year, current.graduation_year)
        {
            if graduation_year < entry_year {
                return Err(AppError::Validation(
                    "entry_year cannot be after graduation_year".into(),
                ));
            }
        }

        let changes = self.profile_changes(id, req).await?;
        let student = self
            .repo
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("student not found".into()))?;

        tracing::info!("Updated student {}", student.id);
        Ok(student)
    }

    pub async fn update_alumni(&self, id: i64, req: AlumniUpdate) -> Result<Student, AppError> {
        let current = self.get_alumni(id).await?;
        req.validate(&current)?;

        let mut changes = self.profile_changes(id, req.profile).await?;
        changes.graduation_year = req.graduation_year;
        changes.phone = req.phone.map(|p| p.trim().to_string());
        changes.address = req.address.map(|a| a.trim().to_string());

        let student = self
            .repo
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("alumni not found".into()))?;

        tracing::info!("Updated alumni {}", student.id);
        Ok(student)
    }

    /// active → graduated，不可逆
    pub async fn graduate(&self, id: i64, graduation: Graduation) -> Result<Student, AppError> {
        let current = self.get(id).await?;
        current.status.ensure_can_graduate()?;
        graduation.validate(current.entry_year)?;

        match self.repo.graduate(id, &graduation).await? {
            Some(student) => {
                tracing::info!(
                    "Student {} graduated in {}",
                    student.id,
                    graduation.graduation_year
                );
                Ok(student)
            }
            None => {
                // 并发情况下状态已被修改，重新读取以确定原因
                let latest = self.get(id).await?;
                latest.status.ensure_can_graduate()?;
                Err(AppError::InvalidState(
                    "student status changed during graduation".into(),
                ))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.soft_delete(id).await? {
            return Err(AppError::NotFound("student not found".into()));
        }
        tracing::info!("Soft-deleted student {}", id);
        Ok(())
    }

    async fn profile_changes(&self, id: i64, req: StudentUpdate) -> Result<StudentChanges, AppError> {
        let nim = req.nim.map(|n| n.trim().to_string());
        let email = req.email.as_deref().map(normalize_email);
        self.ensure_unique(Some(id), nim.as_deref(), email.as_deref())
            .await?;

        let password_hash = match req.password {
            Some(password) => Some(hash_password(&password, self.bcrypt_cost)?),
            None => None,
        };

        Ok(StudentChanges {
            nim,
            name: req.name.map(|n| n.trim().to_string()),
            department: req.department.map(|d| d.trim().to_string()),
            entry_year: req.entry_year,
            email,
            password_hash,
            ..Default::default()
        })
    }

    async fn ensure_unique(
        &self,
        id: Option<i64>,
        nim: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(nim) = nim {
            if let Some(existing) = self.repo.find_by_nim(nim).await? {
                if Some(existing.id) != id {
                    return Err(AppError::Duplicate("nim already registered".into()));
                }
            }
        }
        if let Some(email) = email {
            if let Some(existing) = self.repo.find_by_email(email).await? {
                if Some(existing.id) != id {
                    return Err(AppError::Duplicate("email already registered".into()));
                }
            }
        }
        Ok(())
    }
}
