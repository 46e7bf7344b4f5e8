use crate::AppState;
use crate::api::error::AppError;
use crate::api::handlers::SuccessResponse;
use crate::entities::pastes::{self, PasteKind};
use crate::models::{CurrentUser, NewPaste, NumberOrString, PasswordOption, PastePayload};
use crate::services::disclosure::Disclosure;
use crate::services::settings_service::SettingsService;
use crate::utils::validation::{extension_of, sanitize_filename};
use axum::{
    Extension, Json,
    body::Body,
    extract::{ConnectInfo, FromRequest, Multipart, Path, Query, Request, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio_util::io::{ReaderStream, StreamReader};
use utoipa::ToSchema;

/// RFC 5987 `attr-char` minus the characters browsers mishandle.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreatePasteRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    /// Lifetime in days; fractions allowed. Numbers and numeric strings both work.
    #[schema(value_type = Option<f64>)]
    pub expires_in: Option<NumberOrString>,
    /// `none`, `random` or `custom`.
    pub password_option: Option<String>,
    pub custom_password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PasteSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PasteKind,
    pub size: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_password: bool,
}

impl From<&pastes::Model> for PasteSummary {
    fn from(p: &pastes::Model) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            kind: p.kind,
            size: p.size,
            expires_at: p.expires_at,
            has_password: p.has_password(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePasteResponse {
    pub success: bool,
    pub paste: PasteSummary,
    /// Only present for `passwordOption=random`; shown once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PasteMetadataResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: PasteKind,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_password: bool,
    pub original_filename: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct VerifyRequest {
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyTextResponse {
    pub content: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyFileResponse {
    pub download: bool,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_token: Option<String>,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
}

/// Fields of a create request once the transport encoding is gone.
#[derive(Default)]
struct CreateFields {
    name: Option<String>,
    content: Option<String>,
    expires_in: Option<NumberOrString>,
    password_option: Option<String>,
    custom_password: Option<String>,
    file: Option<(crate::services::storage::StagedFile, String)>,
}

impl From<CreatePasteRequest> for CreateFields {
    fn from(req: CreatePasteRequest) -> Self {
        Self {
            name: req.name,
            content: req.content,
            expires_in: req.expires_in,
            password_option: req.password_option,
            custom_password: req.custom_password,
            file: None,
        }
    }
}

impl CreateFields {
    fn into_new_paste(self) -> Result<NewPaste, AppError> {
        let expires_in_days = match &self.expires_in {
            Some(raw) => raw.to_f64()?,
            None => None,
        };
        let password =
            PasswordOption::from_request(self.password_option.as_deref(), self.custom_password)?;

        let payload = match self.file {
            Some((staged, original_filename)) => PastePayload::File {
                staged,
                original_filename,
            },
            None => PastePayload::Text(self.content.unwrap_or_default()),
        };

        Ok(NewPaste {
            name: self.name,
            payload,
            password,
            expires_in_days,
        })
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    let msg = e.to_string();
    if msg.contains("length limit exceeded") {
        AppError::Validation("Request body exceeds the maximum allowed size".to_string())
    } else {
        AppError::Validation(msg)
    }
}

/// Reads the form. The file part is streamed straight into storage, capped
/// at `max_size`; a blocked filename is refused before any byte is written.
async fn read_multipart(
    state: &AppState,
    multipart: &mut Multipart,
    fields: &mut CreateFields,
    max_size: u64,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                // An untouched file input arrives as an empty part with no name
                let original = match field.file_name().map(str::trim) {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => {
                        field.bytes().await.map_err(multipart_error)?;
                        continue;
                    }
                };
                if fields.file.is_some() {
                    return Err(AppError::Validation("Only one file per paste".to_string()));
                }
                let filename = sanitize_filename(&original)?;
                let extension = extension_of(&filename);

                let reader = StreamReader::new(field.map_err(std::io::Error::other));
                let staged = state
                    .storage
                    .stage_stream(Box::new(Box::pin(reader)), max_size, extension.as_deref())
                    .await?;
                fields.file = Some((staged, filename));
            }
            "name" | "content" | "expiresIn" | "passwordOption" | "customPassword" => {
                let text = field.text().await.map_err(multipart_error)?;
                match name.as_str() {
                    "name" => fields.name = Some(text),
                    "content" => fields.content = Some(text),
                    "expiresIn" => fields.expires_in = Some(NumberOrString::Text(text)),
                    "passwordOption" => fields.password_option = Some(text),
                    _ => fields.custom_password = Some(text),
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/pastes",
    request_body(
        content = CreatePasteRequest,
        description = "JSON body, or multipart/form-data with the same fields plus `file`"
    ),
    responses(
        (status = 200, description = "Paste created", body = CreatePasteResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Authentication required")
    ),
    security(("jwt" = [])),
    tag = "pastes"
)]
pub async fn create_paste(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    req: Request,
) -> Result<Json<CreatePasteResponse>, AppError> {
    let limits = SettingsService::resolve(&state.db).await?;

    let fields = if is_multipart(req.headers()) {
        let mut multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let mut fields = CreateFields::default();
        if let Err(e) =
            read_multipart(&state, &mut multipart, &mut fields, limits.max_file_size_bytes).await
        {
            if let Some((staged, _)) = &fields.file {
                state.pastes.discard_staged(&staged.key).await;
            }
            return Err(e);
        }
        fields
    } else {
        let Json(body) = Json::<CreatePasteRequest>::from_request(req, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        CreateFields::from(body)
    };

    let staged_key = fields.file.as_ref().map(|(staged, _)| staged.key.clone());
    let new_paste = match fields.into_new_paste() {
        Ok(new_paste) => new_paste,
        Err(e) => {
            if let Some(key) = staged_key {
                state.pastes.discard_staged(&key).await;
            }
            return Err(e);
        }
    };

    let created = state.pastes.create(&user.id, new_paste, &limits).await?;

    Ok(Json(CreatePasteResponse {
        success: true,
        paste: PasteSummary::from(&created.paste),
        generated_password: created.generated_password,
    }))
}

#[utoipa::path(
    get,
    path = "/api/pastes/{id}",
    params(("id" = String, Path, description = "Paste ID")),
    responses(
        (status = 200, description = "Paste metadata", body = PasteMetadataResponse),
        (status = 404, description = "Paste not found or expired")
    ),
    tag = "pastes"
)]
pub async fn get_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PasteMetadataResponse>, AppError> {
    let (paste, owner) = state.pastes.get_with_owner(&id).await?;

    Ok(Json(PasteMetadataResponse {
        kind: paste.kind,
        has_password: paste.has_password(),
        id: paste.id,
        name: paste.name,
        username: owner.username,
        size: paste.size,
        created_at: paste.created_at,
        expires_at: paste.expires_at,
        original_filename: paste.original_filename,
    }))
}

/// Address used to key verification throttling.
///
/// The socket peer is authoritative. Forwarding headers are read only when
/// the deployment declares a trusted reverse proxy in front of the server.
pub(crate) fn client_address(
    peer: Option<SocketAddr>,
    headers: &HeaderMap,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/api/pastes/{id}/verify",
    params(("id" = String, Path, description = "Paste ID")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Text content, or file download details", body = VerifyTextResponse),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "Paste not found or expired"),
        (status = 429, description = "Too many failed attempts")
    ),
    tag = "pastes"
)]
pub async fn verify_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Option<Json<VerifyRequest>>,
) -> Result<Response, AppError> {
    let password = body.and_then(|Json(b)| b.password).unwrap_or_default();
    let paste = state.pastes.get(&id).await?;

    let client = client_address(
        peer.map(|ConnectInfo(addr)| addr),
        &headers,
        state.config.trust_proxy_headers,
    );
    let gated = paste.has_password();
    if gated && state.verify_throttle.is_blocked(&client, &paste.id) {
        tracing::warn!("Verification throttled for {} on paste {}", client, paste.id);
        return Err(AppError::TooManyRequests(
            "Too many failed attempts. Try again later.".to_string(),
        ));
    }

    let unlocked = gated
        && !password.is_empty()
        && state.pastes.verify_password(&paste.id, &password).await?;

    let disclosure = match state.disclosure.disclose(&paste, unlocked) {
        Ok(disclosure) => disclosure,
        Err(e) => {
            if matches!(e, AppError::Unauthorized(_)) {
                state.verify_throttle.record_failure(&client, &paste.id);
            }
            return Err(e);
        }
    };

    if gated {
        state.verify_throttle.record_success(&client, &paste.id);
    }

    Ok(match disclosure {
        Disclosure::Text { content } => Json(VerifyTextResponse { content }).into_response(),
        Disclosure::File {
            filename,
            download_token,
        } => Json(VerifyFileResponse {
            download: true,
            filename,
            download_token,
        })
        .into_response(),
    })
}

/// `attachment` disposition with a plain ASCII `filename` and the exact
/// UTF-8 name in `filename*`.
pub(crate) fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();
    let fallback = if ascii.trim().is_empty() { "file" } else { ascii.as_str() };
    let encoded = utf8_percent_encode(filename, FILENAME_ENCODE_SET);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[utoipa::path(
    get,
    path = "/api/pastes/{id}/download",
    params(
        ("id" = String, Path, description = "Paste ID"),
        ("token" = Option<String>, Query, description = "Download token from verify, required for password-protected files")
    ),
    responses(
        (status = 200, description = "File stream"),
        (status = 401, description = "Invalid or expired download token"),
        (status = 404, description = "File not found")
    ),
    tag = "pastes"
)]
pub async fn download_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let paste = match state.pastes.get(&id).await {
        Ok(paste) if paste.kind == PasteKind::File => paste,
        Ok(_) | Err(AppError::NotFound(_)) => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(e),
    };

    state
        .disclosure
        .authorize_download(&paste, query.token.as_deref())?;

    let key = paste
        .file_path
        .as_deref()
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let object = state.storage.open(key).await?.ok_or_else(|| {
        tracing::warn!("Backing file {} of paste {} is missing", key, paste.id);
        AppError::NotFound("File not found on server".to_string())
    })?;

    let filename = paste.original_filename.as_deref().unwrap_or("file");
    let content_type = mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string();

    let body = Body::from_stream(ReaderStream::new(object.reader));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, object.size.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        body,
    )
        .into_response())
}

#[utoipa::path(
    delete,
    path = "/api/pastes/{id}",
    params(("id" = String, Path, description = "Paste ID")),
    responses(
        (status = 200, description = "Paste deleted", body = SuccessResponse),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Paste not found")
    ),
    security(("jwt" = [])),
    tag = "pastes"
)]
pub async fn delete_paste(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.pastes.delete(&id, &user).await?;
    Ok(Json(SuccessResponse { success: true }))
}
