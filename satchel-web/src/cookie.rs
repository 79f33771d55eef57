//! Session cookie reading and rendering

use crate::{WebError, WebResult};
use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use satchel_core::{CookieDirective, SameSitePolicy, SessionSettings};

/// Sealed session cookie value sent by the client, if any
pub fn read_session_cookie(settings: &SessionSettings, headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(&settings.name)
        .map(|cookie| cookie.value().to_string())
}

/// Cookie to send for a directive; `None` leaves the client cookie alone
pub fn render_directive(
    settings: &SessionSettings,
    directive: &CookieDirective,
) -> Option<Cookie<'static>> {
    match directive {
        CookieDirective::None => None,
        CookieDirective::Set(value) => {
            let mut cookie = base_cookie(settings, value.clone());
            // Max-Age is whole seconds; round up so short lifetimes never render as 0
            if let Some(ttl_ms) = settings.cookie.ttl_ms {
                cookie.set_max_age(time::Duration::seconds(ttl_ms.div_ceil(1000) as i64));
            }
            Some(cookie)
        }
        CookieDirective::Clear => {
            let mut cookie = base_cookie(settings, String::new());
            cookie.make_removal();
            Some(cookie)
        }
    }
}

/// Append the Set-Cookie header for a directive
pub fn apply_directive(
    settings: &SessionSettings,
    directive: &CookieDirective,
    headers: &mut HeaderMap,
) -> WebResult<()> {
    if let Some(cookie) = render_directive(settings, directive) {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| WebError::Config(format!("Session cookie is not a valid header: {}", e)))?;
        headers.append(SET_COOKIE, value);
    }

    Ok(())
}

fn base_cookie(settings: &SessionSettings, value: String) -> Cookie<'static> {
    let options = &settings.cookie;

    let mut cookie = Cookie::new(settings.name.clone(), value);
    cookie.set_path(options.path.clone());
    cookie.set_secure(options.is_secure);
    cookie.set_http_only(options.is_http_only);

    if let Some(domain) = &options.domain {
        cookie.set_domain(domain.clone());
    }

    match options.same_site {
        SameSitePolicy::Strict => cookie.set_same_site(SameSite::Strict),
        SameSitePolicy::Lax => cookie.set_same_site(SameSite::Lax),
        SameSitePolicy::None => cookie.set_same_site(SameSite::None),
        SameSitePolicy::Disabled => {}
    }

    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SessionSettings {
        SessionSettings::with_password("password-should-be-32-characters-long")
    }

    #[test]
    fn test_read_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("other=1; session=sealed.value.here"),
        );

        assert_eq!(
            read_session_cookie(&settings(), &headers).as_deref(),
            Some("sealed.value.here")
        );
        assert_eq!(read_session_cookie(&settings(), &HeaderMap::new()), None);
    }

    #[test]
    fn test_set_cookie_carries_options() {
        let mut settings = settings();
        settings.cookie.ttl_ms = Some(60_000);
        settings.cookie.domain = Some("example.com".to_string());

        let cookie = render_directive(&settings, &CookieDirective::Set("abc".to_string())).unwrap();
        let rendered = cookie.to_string();

        assert!(rendered.starts_with("session=abc"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(rendered.contains("Domain=example.com"));
        assert!(rendered.contains("Max-Age=60"));
        assert!(!rendered.contains("HttpOnly"));
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        let mut settings = settings();
        settings.cookie.ttl_ms = Some(500);
        let cookie = render_directive(&settings, &CookieDirective::Set("abc".to_string())).unwrap();
        assert!(cookie.to_string().contains("Max-Age=1"));

        settings.cookie.ttl_ms = Some(1_500);
        let cookie = render_directive(&settings, &CookieDirective::Set("abc".to_string())).unwrap();
        assert!(cookie.to_string().contains("Max-Age=2"));
    }

    #[test]
    fn test_disabled_same_site_is_omitted() {
        let mut settings = settings();
        settings.cookie.same_site = SameSitePolicy::Disabled;

        let cookie = render_directive(&settings, &CookieDirective::Set("abc".to_string())).unwrap();
        assert!(!cookie.to_string().contains("SameSite"));
    }

    #[test]
    fn test_clear_expires_cookie() {
        let mut headers = HeaderMap::new();
        apply_directive(&settings(), &CookieDirective::Clear, &mut headers).unwrap();

        let value = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(value.starts_with("session=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn test_none_writes_nothing() {
        let mut headers = HeaderMap::new();
        apply_directive(&settings(), &CookieDirective::None, &mut headers).unwrap();
        assert!(headers.is_empty());
    }
}
