use axum::http::{header, HeaderMap};

pub const SESSION_COOKIE_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub name: String,
    pub secure: bool,
}

pub fn build_session_cookie(value: &str, max_age_secs: i64, options: &CookieOptions) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
        options.name, value, SESSION_COOKIE_PATH, max_age_secs
    );
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn build_clear_cookie(options: &CookieOptions) -> String {
    build_session_cookie("", 0, options)
}

pub fn extract_cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

/// Session token from any `Cookie` header on the request.
pub fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| extract_cookie_value(v, name))
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(secure: bool) -> CookieOptions {
        CookieOptions { name: "session".into(), secure }
    }

    #[test]
    fn session_cookie_includes_security_attributes() {
        let cookie = build_session_cookie("abc", 7_776_000, &opts(true));
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=7776000"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = build_clear_cookie(&opts(false));
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn session_token_reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, "theme=dark".parse().unwrap());
        headers.append(header::COOKIE, "a=1; session=tok-value; b=2".parse().unwrap());
        assert_eq!(session_token(&headers, "session").as_deref(), Some("tok-value"));
        assert!(session_token(&headers, "missing").is_none());

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, "session=".parse().unwrap());
        assert!(session_token(&empty, "session").is_none());
    }
}
