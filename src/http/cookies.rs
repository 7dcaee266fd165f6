//! Session cookie helpers. The cookie carries only an opaque session id; the
//! session registry resolves it to `(pin, participantId, role)`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use std::borrow::Cow;
use std::time::Duration;

pub const SESSION_COOKIE_NAME: &str = "quiz_session_id";
const SESSION_COOKIE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub fn session_cookie(session_id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, Cow::Owned(session_id));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Some(
        time::Duration::try_from(SESSION_COOKIE_MAX_AGE).unwrap_or(time::Duration::ZERO),
    ));
    cookie
}

/// An expired cookie that instructs the client to drop the session id.
pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Some(time::Duration::ZERO));
    cookie
}
