//! One-shot user messages carried across a redirect in a signed cookie.

use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha512};

const FLASH_COOKIE: &str = "_flash";

/// Derive the cookie signing key from the configured secret.
///
/// The secret may be any length; SHA-512 stretches or compresses it to the
/// 64 bytes the key needs.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Queue a message for the next rendered page.
pub fn push(jar: SignedCookieJar, message: &str) -> SignedCookieJar {
    let mut messages = read(&jar);
    messages.push(message.to_string());

    let cookie = Cookie::build((FLASH_COOKIE, encode(&messages)))
        .path("/")
        .http_only(true);
    jar.add(cookie)
}

/// Take all queued messages, clearing the cookie.
pub fn take(jar: SignedCookieJar) -> (SignedCookieJar, Vec<String>) {
    let messages = read(&jar);
    if messages.is_empty() {
        return (jar, messages);
    }
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, messages)
}

fn read(jar: &SignedCookieJar) -> Vec<String> {
    jar.get(FLASH_COOKIE)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn encode(messages: &[String]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    BASE64_URL_SAFE_NO_PAD.encode(json)
}

/// A cookie that fails to decode is treated as carrying no messages.
fn decode(value: &str) -> Vec<String> {
    BASE64_URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}
