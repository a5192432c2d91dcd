use regex::Regex;

use crate::error::AppError;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const MESSAGE_MAX_LEN: usize = 300;

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

pub fn validate_username(username: &str) -> Result<&str, AppError> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at least {USERNAME_MIN_LEN} characters long"
        )));
    }
    if len > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Username cannot exceed {USERNAME_MAX_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(username)
}

/// Trimmed and lowercased on success.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !valid_email(&email) {
        return Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<&str, AppError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters long"
        )));
    }
    Ok(password)
}

/// Checks the trimmed form; callers store the content as given.
pub fn validate_message_content(content: &str) -> Result<(), AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MESSAGE_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Message cannot exceed {MESSAGE_MAX_LEN} characters"
        )));
    }
    Ok(())
}
