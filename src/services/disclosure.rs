//! What a reader may see of a live paste.
//!
//! Liveness is settled before this module is reached: callers fetch through
//! [`PasteService::get`](crate::services::paste_service::PasteService::get),
//! which reports missing and expired pastes identically. From there:
//!
//! * no password: text is returned inline, files are downloadable directly;
//! * password set: nothing is disclosed until a matching password arrives.
//!   Text is then returned once; files get a short-lived download token bound
//!   to the paste id, which the download endpoint checks instead of the
//!   password.

use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::pastes::{self, PasteKind};
use crate::utils::auth::{issue_download_token, verify_download_token};

pub const INVALID_PASSWORD: &str = "Invalid password";
pub const INVALID_DOWNLOAD_TOKEN: &str =
    "Invalid or expired download token. Please verify password again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    PublicText,
    PublicFile,
    PasswordGated,
}

impl AccessState {
    pub fn of(paste: &pastes::Model) -> Self {
        match (paste.has_password(), paste.kind) {
            (true, _) => AccessState::PasswordGated,
            (false, PasteKind::Text) => AccessState::PublicText,
            (false, PasteKind::File) => AccessState::PublicFile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disclosure {
    Text {
        content: String,
    },
    File {
        filename: String,
        /// Present only for password-gated files.
        download_token: Option<String>,
    },
}

#[derive(Clone)]
pub struct ContentDisclosure {
    secret: String,
    token_ttl_secs: i64,
}

impl ContentDisclosure {
    pub fn new(secret: impl Into<String>, token_ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            token_ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.download_token_ttl_secs)
    }

    /// Resolves a read of a live paste. `unlocked` is the outcome of
    /// [`PasteService::verify_password`](crate::services::paste_service::PasteService::verify_password);
    /// a gated paste that is not unlocked yields the same `Unauthorized`
    /// error whatever the reason.
    pub fn disclose(&self, paste: &pastes::Model, unlocked: bool) -> Result<Disclosure, AppError> {
        match AccessState::of(paste) {
            AccessState::PublicText => Ok(text_of(paste)),
            AccessState::PublicFile => Ok(Disclosure::File {
                filename: filename_of(paste),
                download_token: None,
            }),
            AccessState::PasswordGated => {
                if !unlocked {
                    return Err(AppError::Unauthorized(INVALID_PASSWORD.to_string()));
                }

                match paste.kind {
                    PasteKind::Text => Ok(text_of(paste)),
                    PasteKind::File => {
                        let token =
                            issue_download_token(&paste.id, &self.secret, self.token_ttl_secs)?;
                        Ok(Disclosure::File {
                            filename: filename_of(paste),
                            download_token: Some(token),
                        })
                    }
                }
            }
        }
    }

    /// Gatekeeper for the download endpoint. Public files pass; gated files
    /// need a token minted for this exact paste.
    pub fn authorize_download(
        &self,
        paste: &pastes::Model,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        if !paste.has_password() {
            return Ok(());
        }

        match token {
            Some(token) if verify_download_token(token, &paste.id, &self.secret) => Ok(()),
            _ => Err(AppError::Unauthorized(INVALID_DOWNLOAD_TOKEN.to_string())),
        }
    }
}

fn text_of(paste: &pastes::Model) -> Disclosure {
    Disclosure::Text {
        content: paste.content.clone().unwrap_or_default(),
    }
}

fn filename_of(paste: &pastes::Model) -> String {
    paste
        .original_filename
        .clone()
        .unwrap_or_else(|| "file".to_string())
}
