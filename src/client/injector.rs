use http::header::{AUTHORIZATION, HeaderValue};
use tracing::warn;

use crate::models::{ApiRequest, normalize_token};
use crate::store::CredentialStore;

/// Returns a copy of `request` whose only `Authorization` header is
/// `Bearer <token>`. Any pre-existing credentials are dropped; with no usable
/// token the request goes out without one.
pub fn with_bearer(mut request: ApiRequest, token: Option<&str>) -> ApiRequest {
    request.headers.remove(AUTHORIZATION);

    if let Some(token) = token.and_then(normalize_token) {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("Stored access token is not a valid header value; sending without it"),
        }
    }
    request
}

/// Decorates `request` with the access token held by `store` right now.
///
/// The store is read on every call, never cached, so a replay built after a
/// refresh picks up the new token. Returns the decorated request and the
/// normalised token it carries.
pub async fn authorize(
    request: &ApiRequest,
    store: &dyn CredentialStore,
) -> (ApiRequest, Option<String>) {
    if !request.authenticated {
        return (request.clone(), None);
    }
    let token = store
        .get_access_token()
        .await
        .and_then(|t| normalize_token(&t));
    (with_bearer(request.clone(), token.as_deref()), token)
}
