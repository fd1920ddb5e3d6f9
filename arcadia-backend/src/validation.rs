/// Input validation functions for all backend routes
use arcadia_db::Category;
use thiserror::Error;

pub const USERNAME_MAX_CHARS: usize = 32;
pub const PASSWORD_MAX_CHARS: usize = 128;
pub const TITLE_MAX_CHARS: usize = 120;
pub const DESCRIPTION_MAX_CHARS: usize = 5000;
pub const COMMENT_MAX_CHARS: usize = 1000;

const GAME_FILE_EXTENSIONS: [&str; 2] = [".html", ".htm"];
const USERNAME_FORBIDDEN_CHARS: [char; 6] = ['/', '\\', '<', '>', '"', '\''];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Username cannot be empty")]
    UsernameEmpty,

    #[error("Username too long (max 32 characters, got {0})")]
    UsernameTooLong(usize),

    #[error("Username contains invalid characters")]
    UsernameInvalidChars,

    #[error("Password cannot be empty")]
    PasswordEmpty,

    #[error("Password too long (max 128 characters, got {0})")]
    PasswordTooLong(usize),

    #[error("Title cannot be empty")]
    TitleEmpty,

    #[error("Title too long (max 120 characters, got {0})")]
    TitleTooLong(usize),

    #[error("Description too long (max 5000 characters, got {0})")]
    DescriptionTooLong(usize),

    #[error("Category is required")]
    CategoryMissing,

    #[error("Unknown category")]
    CategoryUnknown,

    #[error("Game file is required")]
    GameFileMissing,

    #[error("Game file must be an .html or .htm file")]
    GameFileExtension,

    #[error("Game file must be UTF-8 text")]
    GameFileEncoding,

    #[error("Cover image is required")]
    CoverMissing,

    #[error("Cover image is not a recognised image format")]
    CoverNotImage,

    #[error("Comment cannot be empty")]
    CommentEmpty,

    #[error("Comment too long (max 1000 characters, got {0})")]
    CommentTooLong(usize),

    #[error("Malformed form data")]
    MalformedForm,
}

/// Validates a username and returns it trimmed
///
/// Rules:
/// - Cannot be empty after trimming
/// - Max 32 characters
/// - No control characters, slashes, angle brackets or quotes
pub fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::UsernameEmpty);
    }

    let len = name.chars().count();
    if len > USERNAME_MAX_CHARS {
        return Err(ValidationError::UsernameTooLong(len));
    }

    if name
        .chars()
        .any(|c| c.is_control() || USERNAME_FORBIDDEN_CHARS.contains(&c))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }

    Ok(name.to_string())
}

/// Validates a password and returns it trimmed
pub fn validate_password(raw: &str) -> Result<String, ValidationError> {
    let password = raw.trim();
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }

    let len = password.chars().count();
    if len > PASSWORD_MAX_CHARS {
        return Err(ValidationError::PasswordTooLong(len));
    }

    Ok(password.to_string())
}

pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }

    let len = title.chars().count();
    if len > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong(len));
    }

    Ok(title.to_string())
}

/// Descriptions may be empty
pub fn validate_description(raw: &str) -> Result<String, ValidationError> {
    let description = raw.trim();
    let len = description.chars().count();
    if len > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong(len));
    }
    Ok(description.to_string())
}

/// Parses a category by its exact label
pub fn validate_category(raw: &str) -> Result<Category, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::CategoryMissing);
    }
    raw.parse().map_err(|_| ValidationError::CategoryUnknown)
}

/// Checks the uploaded game file name ends in `.html` or `.htm`, ignoring case
pub fn validate_game_file_name(file_name: &str) -> Result<(), ValidationError> {
    let lower = file_name.to_lowercase();
    if GAME_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        Ok(())
    } else {
        Err(ValidationError::GameFileExtension)
    }
}

/// Decodes the uploaded game as UTF-8
pub fn validate_game_source(bytes: &[u8]) -> Result<&str, ValidationError> {
    std::str::from_utf8(bytes).map_err(|_| ValidationError::GameFileEncoding)
}

/// Checks the cover by its magic bytes, not its name
pub fn validate_cover_image(bytes: &[u8]) -> Result<(), ValidationError> {
    image::guess_format(bytes)
        .map(|_| ())
        .map_err(|_| ValidationError::CoverNotImage)
}

pub fn validate_comment(raw: &str) -> Result<String, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::CommentEmpty);
    }

    let len = text.chars().count();
    if len > COMMENT_MAX_CHARS {
        return Err(ValidationError::CommentTooLong(len));
    }

    Ok(text.to_string())
}
