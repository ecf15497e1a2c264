use cookie::{Cookie, SameSite};
use uuid::Uuid;

use glimpse_core::{CLIENT_ID_COOKIE_MAX_AGE_SECS, CLIENT_ID_COOKIE_NAME};

/// Client identifier resolved for one request.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub id: String,
    pub is_new: bool,
}

impl ClientIdentity {
    /// Resolve the identity from the request's cookie header: reuse the first
    /// `client_id` value when present, mint a fresh UUID otherwise.
    pub fn resolve(cookie_header: Option<&str>) -> Self {
        match extract_client_id(cookie_header) {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: Uuid::new_v4().to_string(),
                is_new: true,
            },
        }
    }
}

/// First `client_id` value in the cookie header, if any.
///
/// `; ` separates pairs, `=` separates key from value, the first match wins
/// on duplicate keys and malformed pairs are ignored. Absence is a normal
/// outcome, not an error.
pub fn extract_client_id(cookie_header: Option<&str>) -> Option<String> {
    let header = cookie_header?;
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CLIENT_ID_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Set-Cookie value persisting the identifier client-side for two years.
pub fn client_cookie(client_id: &str) -> String {
    Cookie::build((CLIENT_ID_COOKIE_NAME, client_id))
        .path("/")
        .max_age(cookie::time::Duration::seconds(
            CLIENT_ID_COOKIE_MAX_AGE_SECS,
        ))
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
        .to_string()
}

/// The cookie is written only for a newly minted identifier on a non-error
/// origin response.
pub fn should_set_cookie(is_new: bool, status: u16) -> bool {
    is_new && status < 400
}
