use serde::{Deserialize, Serialize};

const BEARER_SCHEME: &str = "bearer";

/// Strips any `Bearer ` scheme markers and surrounding whitespace from a stored token.
///
/// Returns `None` for blank input, so an empty string is always treated as absent.
pub fn normalize_token(raw: &str) -> Option<String> {
    let mut token = raw.trim();
    loop {
        let Some(prefix) = token.get(..BEARER_SCHEME.len()) else {
            break;
        };
        let rest = &token[BEARER_SCHEME.len()..];
        // "Bearer" counts as a scheme marker only when followed by whitespace
        // or nothing at all; "bearertoken" is a token.
        if prefix.eq_ignore_ascii_case(BEARER_SCHEME)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            token = rest.trim_start();
        } else {
            break;
        }
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// A short, log-safe fingerprint of a token: first characters plus length.
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{}…({} chars)", visible, token.chars().count())
}

/// The access/refresh token pair held by the credential store.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Builds a normalised pair. Returns `None` when the access token is blank.
    pub fn new(access_token: &str, refresh_token: Option<&str>) -> Option<Self> {
        Some(Credentials {
            access_token: normalize_token(access_token)?,
            refresh_token: refresh_token.and_then(normalize_token),
        })
    }

    /// Re-applies normalisation to values that came from outside (e.g. a file on disk).
    pub fn normalized(self) -> Option<Self> {
        Credentials::new(&self.access_token, self.refresh_token.as_deref())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &redact_token(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact_token),
            )
            .finish()
    }
}
