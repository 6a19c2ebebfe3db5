//! Client-side input validation.
//!
//! Checks run before anything is sent, so a request that fails here never
//! reaches the network. Field checks return `Result<(), String>`; the
//! `validate_*_request` functions collect them with
//! [`ValidationErrorBuilder`](crate::error::ValidationErrorBuilder).

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ClientError, ValidationErrorBuilder};
use crate::models::{
    CreatePipelineRequest, CreateProjectRequest, CreateUserRequest, LoginRequest,
    TriggerBuildRequest,
};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

lazy_static! {
    /// Regex for validating HTTP/HTTPS repository URLs
    static ref REPO_HTTP_URL_REGEX: Regex = Regex::new(
        r"^https?://[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*(:\d+)?(/[-a-zA-Z0-9_%&=+@~.]+)*/?$"
    ).unwrap();

    /// Regex for validating SSH repository URLs
    static ref REPO_SSH_URL_REGEX: Regex = Regex::new(
        r"^(git@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)*:[-a-zA-Z0-9_./]+\.git|ssh://[a-zA-Z0-9@][-a-zA-Z0-9@.]*(/[-a-zA-Z0-9_.]+)+\.git)$"
    ).unwrap();

    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();

    static ref BRANCH_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9._/-]*[a-zA-Z0-9])?$"
    ).unwrap();
}

/// Validate a login username
pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() < USERNAME_MIN_LEN {
        return Err(format!(
            "Username must be at least {} characters",
            USERNAME_MIN_LEN
        ));
    }

    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Username is too long (max {} characters)",
            USERNAME_MAX_LEN
        ));
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a resource name (project or pipeline)
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!("Name is too long (max {} characters)", NAME_MAX_LEN));
    }

    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(format!(
            "Description is too long (max {} characters)",
            DESCRIPTION_MAX_LEN
        ));
    }

    Ok(())
}

/// Validate a repository URL (HTTP/HTTPS or SSH format)
pub fn validate_repo_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("Repository URL is required".to_string());
    }

    if url.len() > 2048 {
        return Err("Repository URL is too long (max 2048 characters)".to_string());
    }

    if (url.starts_with("http://") || url.starts_with("https://"))
        && REPO_HTTP_URL_REGEX.is_match(url)
    {
        return Ok(());
    }

    if (url.starts_with("git@") || url.starts_with("ssh://")) && REPO_SSH_URL_REGEX.is_match(url)
    {
        return Ok(());
    }

    Err("Invalid repository URL format. Must be HTTP(S) or SSH URL".to_string())
}

/// Validate a branch name
pub fn validate_branch(branch: &str) -> Result<(), String> {
    if branch.is_empty() {
        return Err("Branch name is required".to_string());
    }

    if branch.len() > 255 {
        return Err("Branch name is too long (max 255 characters)".to_string());
    }

    if !BRANCH_REGEX.is_match(branch) {
        return Err("Invalid branch name format".to_string());
    }

    if branch.contains("..") {
        return Err("Branch name cannot contain '..'".to_string());
    }

    Ok(())
}

fn validate_id(id: i64, what: &str) -> Result<(), String> {
    if id <= 0 {
        return Err(format!("{} is required", what));
    }
    Ok(())
}

/// Validate the login form
pub fn validate_login_request(request: &LoginRequest) -> Result<(), ClientError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&request.username));
    errors.check("password", validate_password(&request.password));
    errors.finish()
}

pub fn validate_create_user_request(request: &CreateUserRequest) -> Result<(), ClientError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&request.username));
    errors.check("email", validate_email(&request.email));
    errors.check("password", validate_password(&request.password));
    errors.finish()
}

pub fn validate_create_project_request(request: &CreateProjectRequest) -> Result<(), ClientError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_name(&request.name));
    errors.check("description", validate_description(&request.description));
    errors.check("repo_url", validate_repo_url(&request.repo_url));
    errors.check("branch", validate_branch(&request.branch));
    errors.finish()
}

pub fn validate_create_pipeline_request(
    request: &CreatePipelineRequest,
) -> Result<(), ClientError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("project_id", validate_id(request.project_id, "Project"));
    errors.check("name", validate_name(&request.name));
    if request.config.trim().is_empty() {
        errors.add("config", "Pipeline config is required");
    }
    errors.finish()
}

pub fn validate_trigger_build_request(request: &TriggerBuildRequest) -> Result<(), ClientError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("pipeline_id", validate_id(request.pipeline_id, "Pipeline"));
    errors.check("branch", validate_branch(&request.branch));
    errors.finish()
}
