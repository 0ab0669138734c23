#![cfg(feature = "web")]

//! One-shot status messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar};

pub const FLASH_COOKIE: &str = "flash";

fn flash_cookie(value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(FLASH_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

/// Queue `message` for the next rendered page
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    jar.add(flash_cookie(urlencoding::encode(message).into_owned()))
}

/// Pop the pending message, if any
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(FLASH_COOKIE)
        .and_then(|c| urlencoding::decode(c.value()).ok())
        .map(|m| m.into_owned())
        .filter(|m| !m.is_empty());

    match message {
        Some(message) => (jar.remove(flash_cookie(String::new())), Some(message)),
        None => (jar, None),
    }
}
