use axum::http::{header, HeaderMap};

use crate::config::SessionConfig;

/// Read a cookie value from every `Cookie` header on the request
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` value storing the session credential
pub fn session_cookie(token: &str, config: &SessionConfig) -> String {
    build(&config.cookie_name, token, config.cookie_max_age_secs, config.secure_cookie)
}

/// `Set-Cookie` value that removes the session credential
pub fn clear_session_cookie(config: &SessionConfig) -> String {
    build(&config.cookie_name, "", 0, config.secure_cookie)
}

fn build(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "auth_token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn reads_across_multiple_headers_and_skips_empty() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("auth_token="));
        assert_eq!(read_cookie(&headers, "auth_token"), None);

        headers.append(header::COOKIE, HeaderValue::from_static("a=1; auth_token=xyz"));
        assert_eq!(read_cookie(&headers, "auth_token").as_deref(), Some("xyz"));
    }

    #[test]
    fn session_cookie_attributes() {
        let mut config = AppConfig::development().session;
        let cookie = session_cookie("tok", &config);
        assert_eq!(cookie, "auth_token=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800");

        config.secure_cookie = true;
        assert!(clear_session_cookie(&config).ends_with("Max-Age=0; Secure"));
    }
}
