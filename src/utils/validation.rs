use std::path::Path;

/// Upload extensions refused outright. A denylist only: renaming a file
/// defeats it, so it is a speed bump and not a content guarantee.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "sh", "ps1", "vbs", "js", "html", "htm", "svg", "php", "asp", "aspx",
    "jsp",
];

/// Usernames that would collide with top-level routes.
pub const RESERVED_USERNAMES: &[&str] = &["admin", "api", "static", "public", "register", "login"];

const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Lowercased extension of `filename`, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

pub fn is_blocked_extension(filename: &str) -> bool {
    extension_of(filename).is_some_and(|ext| BLOCKED_EXTENSIONS.contains(&ext.as_str()))
}

/// Sanitizes a client-supplied filename for display and `Content-Disposition`.
///
/// Keeps only the final path component, replaces control and reserved
/// characters, caps the length and rejects denylisted extensions. The result
/// is never used as an on-disk path.
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    // Treat both separators as path breaks regardless of host OS
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from upload name: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' => '_',
            c => c,
        })
        .collect();

    let sanitized = if sanitized.len() > MAX_FILENAME_BYTES {
        let mut end = MAX_FILENAME_BYTES;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    if let Some(ext) = extension_of(&sanitized) {
        if BLOCKED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ValidationError {
                code: "BLOCKED_EXTENSION",
                message: format!("File type .{} is not allowed for security reasons", ext),
            });
        }
    }

    Ok(sanitized)
}

/// Username rules for self-registration.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < 3 || username.len() > 30 {
        return Err(ValidationError {
            code: "INVALID_USERNAME",
            message: "Username must be 3-30 characters".to_string(),
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError {
            code: "INVALID_USERNAME",
            message: "Username can only contain letters, numbers, underscores, and hyphens"
                .to_string(),
        });
    }

    let lowered = username.to_lowercase();
    if RESERVED_USERNAMES.contains(&lowered.as_str()) {
        return Err(ValidationError {
            code: "RESERVED_USERNAME",
            message: "This username is reserved".to_string(),
        });
    }

    Ok(())
}
