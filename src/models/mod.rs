use crate::entities::pastes;
use crate::services::storage::StagedFile;
use crate::utils::validation::ValidationError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Paste limits read from the settings table for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub max_file_size_bytes: u64,
    pub max_expiration_days: u32,
}

impl ResolvedSettings {
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size_bytes / 1024 / 1024
    }
}

/// The authenticated caller, as resolved by the auth middleware.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_admin || self.id == owner_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordOption {
    None,
    Random,
    Custom(String),
}

impl PasswordOption {
    /// Interprets the `passwordOption` / `customPassword` pair sent by clients.
    ///
    /// `none`, the retired `default` option, unknown values and an absent
    /// option all mean no password. `custom` without a password is refused.
    pub fn from_request(option: Option<&str>, custom: Option<String>) -> Result<Self, ValidationError> {
        match option.map(str::trim) {
            Some("random") => Ok(PasswordOption::Random),
            Some("custom") => match custom.filter(|p| !p.is_empty()) {
                Some(password) => Ok(PasswordOption::Custom(password)),
                None => Err(ValidationError {
                    code: "MISSING_PASSWORD",
                    message: "Custom password required".to_string(),
                }),
            },
            _ => Ok(PasswordOption::None),
        }
    }
}

pub enum PastePayload {
    Text(String),
    File {
        staged: StagedFile,
        original_filename: String,
    },
}

impl PastePayload {
    pub fn kind(&self) -> pastes::PasteKind {
        match self {
            PastePayload::Text(_) => pastes::PasteKind::Text,
            PastePayload::File { .. } => pastes::PasteKind::File,
        }
    }

    pub fn staged_key(&self) -> Option<&str> {
        match self {
            PastePayload::File { staged, .. } => Some(&staged.key),
            PastePayload::Text(_) => None,
        }
    }
}

pub struct NewPaste {
    pub name: Option<String>,
    pub payload: PastePayload,
    pub password: PasswordOption,
    pub expires_in_days: Option<f64>,
}

pub struct CreatedPaste {
    pub paste: pastes::Model,
    /// Plaintext of a server-generated password. Returned once, never stored.
    pub generated_password: Option<String>,
}

/// Form fields arrive as strings, JSON clients often send numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    /// `Ok(None)` for an empty string, `Err` for anything non-numeric.
    pub fn to_f64(&self) -> Result<Option<f64>, ValidationError> {
        match self {
            NumberOrString::Number(n) => Ok(Some(*n)),
            NumberOrString::Text(s) if s.trim().is_empty() => Ok(None),
            NumberOrString::Text(s) => {
                s.trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ValidationError {
                        code: "NOT_A_NUMBER",
                        message: format!("'{}' is not a number", s.trim()),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_option_parsing() {
        assert_eq!(
            PasswordOption::from_request(None, None).unwrap(),
            PasswordOption::None
        );
        assert_eq!(
            PasswordOption::from_request(Some("default"), None).unwrap(),
            PasswordOption::None
        );
        assert_eq!(
            PasswordOption::from_request(Some("bogus"), Some("x".into())).unwrap(),
            PasswordOption::None
        );
        assert_eq!(
            PasswordOption::from_request(Some("random"), None).unwrap(),
            PasswordOption::Random
        );
        assert_eq!(
            PasswordOption::from_request(Some("custom"), Some("hunter2".into())).unwrap(),
            PasswordOption::Custom("hunter2".into())
        );
        assert!(PasswordOption::from_request(Some("custom"), Some(String::new())).is_err());
        assert!(PasswordOption::from_request(Some("custom"), None).is_err());
    }

    #[test]
    fn test_number_or_string() {
        let v: NumberOrString = serde_json::from_str("1.5").unwrap();
        assert_eq!(v.to_f64().unwrap(), Some(1.5));
        let v: NumberOrString = serde_json::from_str("\"0.0416667\"").unwrap();
        assert_eq!(v.to_f64().unwrap(), Some(0.0416667));
        let v: NumberOrString = serde_json::from_str("\"\"").unwrap();
        assert_eq!(v.to_f64().unwrap(), None);
        let v: NumberOrString = serde_json::from_str("\"soon\"").unwrap();
        assert!(v.to_f64().is_err());
    }

    #[test]
    fn test_current_user_can_manage() {
        let user = CurrentUser {
            id: "u1".into(),
            username: "alice".into(),
            is_admin: false,
        };
        assert!(user.can_manage("u1"));
        assert!(!user.can_manage("u2"));
        let admin = CurrentUser {
            is_admin: true,
            ..user
        };
        assert!(admin.can_manage("u2"));
    }
}
