use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::TransitionError;
use crate::error::AppError;
use crate::utils::validation::{require_email, require_length, require_password, require_range};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Graduated,
    DroppedOut,
    Suspended,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Graduated => "graduated",
            StudentStatus::DroppedOut => "dropped_out",
            StudentStatus::Suspended => "suspended",
        }
    }

    /// 只有 active 可以毕业
    pub fn ensure_can_graduate(self) -> Result<(), TransitionError> {
        match self {
            StudentStatus::Active => Ok(()),
            StudentStatus::Graduated => Err(TransitionError::AlreadyGraduated),
            other => Err(TransitionError::StudentNotActive(other)),
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(StudentStatus::Active),
            "graduated" => Ok(StudentStatus::Graduated),
            "dropped_out" => Ok(StudentStatus::DroppedOut),
            "suspended" => Ok(StudentStatus::Suspended),
            other => Err(AppError::Validation(format!(
                "unknown student status {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub nim: String,
    pub name: String,
    pub department: String,
    pub entry_year: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: StudentStatus,
    pub graduation_year: Option<i32>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn is_alumni(&self) -> bool {
        self.status == StudentStatus::Graduated
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn graduate(&mut self, graduation: &Graduation, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status.ensure_can_graduate()?;
        self.status = StudentStatus::Graduated;
        self.graduation_year = Some(graduation.graduation_year);
        self.phone = Some(graduation.phone.trim().to_string());
        self.address = Some(graduation.address.trim().to_string());
        self.updated_at = at;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterStudent {
    pub nim: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub entry_year: i32,
}

impl RegisterStudent {
    pub fn validate(&self) -> Result<(), AppError> {
        require_length("nim", &self.nim, 1, 20)?;
        require_length("name", &self.name, 2, 100)?;
        require_email(&self.email)?;
        require_password(&self.password)?;
        require_length("department", &self.department, 1, 50)?;
        require_range("entry_year", self.entry_year, MIN_YEAR, MAX_YEAR)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAlumni {
    pub nim: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub entry_year: i32,
    pub graduation_year: i32,
    pub phone: String,
    pub address: String,
}

impl RegisterAlumni {
    pub fn into_parts(self) -> (RegisterStudent, Graduation) {
        (
            RegisterStudent {
                nim: self.nim,
                name: self.name,
                email: self.email,
                password: self.password,
                department: self.department,
                entry_year: self.entry_year,
            },
            Graduation {
                graduation_year: self.graduation_year,
                phone: self.phone,
                address: self.address,
            },
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Graduation {
    pub graduation_year: i32,
    pub phone: String,
    pub address: String,
}

impl Graduation {
    pub fn validate(&self, entry_year: i32) -> Result<(), AppError> {
        require_range("graduation_year", self.graduation_year, MIN_YEAR, MAX_YEAR)?;
        if self.graduation_year < entry_year {
            return Err(AppError::Validation(
                "graduation_year cannot be before entry_year".into(),
            ));
        }
        require_length("phone", &self.phone, 1, 15)?;
        require_length("address", &self.address, 1, 500)
    }
}

/// 部分更新：None 表示不修改
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub nim: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
    pub entry_year: Option<i32>,
}

impl StudentUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(nim) = &self.nim {
            require_length("nim", nim, 1, 20)?;
        }
        if let Some(name) = &self.name {
            require_length("name", name, 2, 100)?;
        }
        if let Some(email) = &self.email {
            require_email(email)?;
        }
        if let Some(password) = &self.password {
            require_password(password)?;
        }
        if let Some(department) = &self.department {
            require_length("department", department, 1, 50)?;
        }
        if let Some(year) = self.entry_year {
            require_range("entry_year", year, MIN_YEAR, MAX_YEAR)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlumniUpdate {
    #[serde(flatten)]
    pub profile: StudentUpdate,
    pub graduation_year: Option<i32>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl AlumniUpdate {
    pub fn validate(&self, current: &Student) -> Result<(), AppError> {
        self.profile.validate()?;
        let graduation = Graduation {
            graduation_year: self
                .graduation_year
                .or(current.graduation_year)
                .unwrap_or(MIN_YEAR),
            phone: self
                .phone
                .clone()
                .or_else(|| current.phone.clone())
                .unwrap_or_default(),
            address: self
                .address
                .clone()
                .or_else(|| current.address.clone())
                .unwrap_or_default(),
        };
        graduation.validate(self.profile.entry_year.unwrap_or(current.entry_year))
    }
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub nim: String,
    pub name: String,
    pub department: String,
    pub entry_year: i32,
    pub email: String,
    pub password_hash: String,
    pub graduation: Option<Graduation>,
}

/// 写入存储层的变更，密码已经过哈希
#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub nim: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub entry_year: Option<i32>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub graduation_year: Option<i32>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl StudentChanges {
    pub fn touches_alumni_fields(&self) -> bool {
        self.graduation_year.is_some() || self.phone.is_some() || self.address.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub status: Option<StudentStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn active_student() -> Student {
        let now = Utc::now();
        Student {
            id: 1,
            nim: "2021001".into(),
            name: "John Doe".into(),
            department: "Informatika".into(),
            entry_year: 2021,
            email: "john@test.com".into(),
            password_hash: "hash".into(),
            status: StudentStatus::Active,
            graduation_year: None,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn graduation() -> Graduation {
        Graduation {
            graduation_year: 2024,
            phone: "081234567890".into(),
            address: "Jakarta".into(),
        }
    }

    #[test]
    fn graduate_sets_alumni_fields_once() {
        let mut student = active_student();
        assert!(!student.is_alumni());

        student.graduate(&graduation(), Utc::now()).expect("graduate");
        assert!(student.is_alumni());
        assert_eq!(student.graduation_year, Some(2024));
        assert_eq!(student.phone.as_deref(), Some("081234567890"));
        assert_eq!(student.address.as_deref(), Some("Jakarta"));

        let second = Graduation {
            graduation_year: 2030,
            phone: "0800".into(),
            address: "Bandung".into(),
        };
        assert_eq!(
            student.graduate(&second, Utc::now()),
            Err(TransitionError::AlreadyGraduated)
        );
        assert_eq!(student.graduation_year, Some(2024));
        assert_eq!(student.address.as_deref(), Some("Jakarta"));
    }

    #[rstest]
    #[case(StudentStatus::DroppedOut)]
    #[case(StudentStatus::Suspended)]
    fn inactive_students_cannot_graduate(#[case] status: StudentStatus) {
        let mut student = active_student();
        student.status = status;
        assert_eq!(
            student.graduate(&graduation(), Utc::now()),
            Err(TransitionError::StudentNotActive(status))
        );
        assert!(student.graduation_year.is_none());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let value = serde_json::to_value(active_student()).expect("json");
        assert!(value.get("password_hash").is_none());
        assert!(value.get("deleted_at").is_none());
        assert_eq!(value["status"], "active");
    }

    #[rstest]
    #[case("dropped_out", StudentStatus::DroppedOut)]
    #[case("GRADUATED", StudentStatus::Graduated)]
    fn status_parses_from_query(#[case] raw: &str, #[case] expected: StudentStatus) {
        assert_eq!(raw.parse::<StudentStatus>().expect("status"), expected);
    }

    #[test]
    fn graduation_year_cannot_precede_entry() {
        let graduation = Graduation {
            graduation_year: 2019,
            ..graduation()
        };
        assert!(graduation.validate(2021).is_err());
        assert!(self::graduation().validate(2021).is_ok());
    }

    #[test]
    fn phone_longer_than_fifteen_is_rejected() {
        let graduation = Graduation {
            phone: "0812345678901234".into(),
            ..graduation()
        };
        assert!(matches!(graduation.validate(2020), Err(AppError::Validation(_))));
    }

    #[test]
    fn register_validation() {
        let mut req = RegisterStudent {
            nim: "2021001".into(),
            name: "John Doe".into(),
            email: "john@test.com".into(),
            password: "password123".into(),
            department: "Informatika".into(),
            entry_year: 2021,
        };
        assert!(req.validate().is_ok());
        req.entry_year = 1800;
        assert!(req.validate().is_err());
    }
}
