use axum::http::{header::InvalidHeaderValue, HeaderValue};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const SESSION_MAX_AGE_SECS: u32 = 60 * 60 * 24 * 7;

pub fn cookie(name: &str, value: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{name}={value}; HttpOnly; Max-Age={SESSION_MAX_AGE_SECS}{secure}; Path=/; SameSite=Lax"
    ))
}

pub fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{name}=; HttpOnly; Max-Age=0{secure}; Path=/; SameSite=Lax"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_flag_follows_config() {
        let plain = cookie("s", "abc", false).unwrap();
        let secure = cookie("s", "abc", true).unwrap();
        assert!(!plain.to_str().unwrap().contains("Secure"));
        assert!(secure.to_str().unwrap().contains("; Secure"));
    }

    #[test]
    fn clearing_expires_immediately() {
        let cleared = clear_cookie("s", false).unwrap();
        assert!(cleared.to_str().unwrap().starts_with("s=; HttpOnly; Max-Age=0"));
    }
}
