use crate::error::AppError;

pub fn require_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        let message = if min <= 1 {
            format!("{field} is required and must be at most {max} characters")
        } else {
            format!("{field} must be between {min} and {max} characters")
        };
        return Err(AppError::Validation(message));
    }
    Ok(())
}

pub fn require_range(field: &str, value: i32, min: i32, max: i32) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(())
}

pub fn require_email(value: &str) -> Result<(), AppError> {
    require_length("email", value, 1, 100)?;
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

pub fn require_password(value: &str) -> Result<(), AppError> {
    // bcrypt 只使用前 72 字节
    if value.len() < 6 || value.len() > 72 {
        return Err(AppError::Validation(
            "password must be between 6 and 72 characters".into(),
        ));
    }
    Ok(())
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}
