use arcadia_db::Timestamp;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};
use rand::rng;
use tracing::warn;

const HASH_PREFIX: &str = "$argon2";
const SESSION_TOKEN_LEN: usize = 48;
const NAME_SUFFIX_LEN: usize = 6;

pub fn generate_session_token() -> String {
  Alphanumeric.sample_string(&mut rng(), SESSION_TOKEN_LEN)
}

/// Argon2 hash of a password as a PHC string (`$argon2id$v=19$...`).
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
  Ok(hash.to_string())
}

/// Check a password against a stored value.
///
/// Values without the argon2 prefix are legacy plaintext and compare directly.
pub fn verify_password(stored: &str, password: &str) -> bool {
  if is_legacy_password(stored) {
    return stored == password;
  }
  match PasswordHash::new(stored) {
    Ok(parsed) => Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok(),
    Err(err) => {
      warn!(error = %err, "stored password hash is unreadable");
      false
    }
  }
}

/// True when the stored value is still plaintext and should be rehashed.
pub fn is_legacy_password(stored: &str) -> bool {
  !stored.starts_with(HASH_PREFIX)
}

/// Insert `_<suffix>` before the extension of a file name.
pub fn with_name_suffix(name: &str, suffix: &str) -> String {
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
    _ => format!("{name}_{suffix}"),
  }
}

pub fn generate_name_suffix() -> String {
  Alphanumeric
    .sample_string(&mut rng(), NAME_SUFFIX_LEN)
    .to_ascii_lowercase()
}

/// Reduce a file name to ASCII letters, digits, `_`, `.` and `-`.
///
/// Whitespace and path separators become `_`, everything else is dropped, and leading or
/// trailing dots and underscores are stripped so the result can never name a parent
/// directory or a hidden file.
pub fn secure_filename(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  for c in name.chars() {
    if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
      out.push(c);
    } else if c.is_whitespace() || c == '/' || c == '\\' {
      out.push('_');
    }
  }
  out.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Storage name for an upload: `<user>_<YYYYmmdd_HHMMSS>_<original>`, made safe.
pub fn stored_filename(username: &str, at: Timestamp, original: &str) -> String {
  let name = secure_filename(&format!(
    "{username}_{}_{original}",
    at.format("%Y%m%d_%H%M%S")
  ));
  if name.is_empty() {
    format!("upload_{}", at.format("%Y%m%d_%H%M%S"))
  } else {
    name
  }
}

/// Current time as stored in the documents.
pub fn timestamp() -> Timestamp {
  Utc::now().naive_utc()
}

/// Current unix time in seconds.
pub fn now() -> i64 {
  Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;

  #[test]
  fn test_session_token_shape() {
    let token = generate_session_token();
    assert_eq!(token.len(), 48);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(token, generate_session_token());
  }

  #[test]
  fn test_password_hash_round_trip() {
    let stored = hash_password("hunter2").unwrap();
    assert!(stored.starts_with("$argon2id$"));
    assert!(!stored.contains("hunter2"));
    assert!(verify_password(&stored, "hunter2"));
    assert!(!verify_password(&stored, "hunter3"));
    assert!(!is_legacy_password(&stored));
  }

  #[test]
  fn test_password_hash_is_salted() {
    assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
  }

  #[test]
  fn test_legacy_plaintext_password() {
    assert!(is_legacy_password("hunter2"));
    assert!(verify_password("hunter2", "hunter2"));
    assert!(!verify_password("hunter2", "Hunter2"));
    // A bare salted sha256 digest is not an accepted hash format
    assert!(is_legacy_password("sha256$salt$abc"));
  }

  #[test]
  fn test_unreadable_hash_never_verifies() {
    assert!(!is_legacy_password("$argon2id$garbage"));
    assert!(!verify_password("$argon2id$garbage", "$argon2id$garbage"));
  }

  #[test]
  fn test_name_suffix() {
    assert_eq!(with_name_suffix("alice_snake.html", "x1y2z3"), "alice_snake_x1y2z3.html");
    assert_eq!(with_name_suffix("upload_20250102", "abc"), "upload_20250102_abc");
    let suffix = generate_name_suffix();
    assert_eq!(suffix.len(), 6);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
  }

  #[test]
  fn test_secure_filename() {
    assert_eq!(secure_filename("My Game.html"), "My_Game.html");
    assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
    assert_eq!(secure_filename("игра.html"), "html");
    assert_eq!(secure_filename(".hidden"), "hidden");
    assert_eq!(secure_filename("a<b>c?.png"), "abc.png");
    assert_eq!(secure_filename("..."), "");
  }

  #[test]
  fn test_stored_filename() {
    let at = NaiveDate::from_ymd_opt(2025, 1, 2)
      .unwrap()
      .and_hms_opt(3, 4, 5)
      .unwrap();
    assert_eq!(
      stored_filename("alice", at, "snake game.html"),
      "alice_20250102_030405_snake_game.html"
    );
    assert_eq!(
      stored_filename("Вася", at, "cover.png"),
      "20250102_030405_cover.png"
    );
    assert_eq!(stored_filename("", at, ""), "20250102_030405");
  }
}
