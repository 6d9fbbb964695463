use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use thiserror::Error;

use crate::models::{Post, User};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username required")]
    UsernameRequired,
    #[error("Password required")]
    PasswordRequired,
    #[error("Email required")]
    EmailRequired,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Title required")]
    TitleRequired,
    #[error("Content required")]
    ContentRequired,
    #[error("Author required")]
    AuthorRequired,
}

/// Which request a `User` is being checked for. Each action requires a
/// different subset of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Create,
    Update,
    Login,
}

impl User {
    /// Normalize client input before validation: drop any client-supplied id,
    /// trim and escape the text fields, and stamp both timestamps.
    pub fn prepare(&mut self) {
        let now = Utc::now();
        self.id = 0;
        self.username = escape_html(self.username.trim());
        self.email = escape_html(self.email.trim());
        self.created_at = now;
        self.updated_at = now;
    }

    pub fn validate(&self, action: UserAction) -> Result<(), ValidationError> {
        if matches!(action, UserAction::Create | UserAction::Update) && self.username.is_empty() {
            return Err(ValidationError::UsernameRequired);
        }
        if self.password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        validate_email(&self.email)
    }
}

impl Post {
    /// Normalize client input before validation. Content is stored in its
    /// readable form, so it is unescaped rather than escaped.
    pub fn prepare(&mut self) {
        let now = Utc::now();
        self.id = 0;
        self.title = escape_html(self.title.trim());
        self.content = unescape_html(self.content.trim());
        self.author = None;
        self.created_at = now;
        self.updated_at = now;
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::TitleRequired);
        }
        if self.content.is_empty() {
            return Err(ValidationError::ContentRequired);
        }
        if self.author_id < 1 {
            return Err(ValidationError::AuthorRequired);
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Escape the characters significant in HTML text and quoted attributes.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

/// Decode named (full HTML5 table) and numeric character references.
pub fn unescape_html(input: &str) -> String {
    html_escape::decode_html_entities(input).into_owned()
}
