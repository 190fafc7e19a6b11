//! Authorization dialog URL and CSRF state

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use url::form_urlencoded;

/// URL of the platform dialog asking the user to authorize the application.
///
/// `state` comes back untouched on the redirect; comparing it against the
/// value stored before redirecting is the caller's job.
pub fn build_authorization_url(
    dialog_base_url: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    scopes: &[&str],
) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state)
        .append_pair("response_type", "code")
        .append_pair("scope", &scopes.join(","))
        .finish();
    format!("{}/authorize?{query}", dialog_base_url.trim_end_matches('/'))
}

/// Random URL-safe value for the `state` parameter (32 bytes, 43 chars).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_has_all_params_in_order() {
        let url = build_authorization_url(
            "https://dialog.example.com/",
            "my-app",
            "https://hostname/request/uri",
            "xyz",
            &["user.read", "user.photos"],
        );
        assert_eq!(
            url,
            "https://dialog.example.com/authorize?client_id=my-app\
             &redirect_uri=https%3A%2F%2Fhostname%2Frequest%2Furi&state=xyz\
             &response_type=code&scope=user.read%2Cuser.photos"
        );
    }

    #[test]
    fn no_scopes_sends_empty_scope() {
        let url = build_authorization_url("https://d", "a", "https://r", "s", &[]);
        assert!(url.ends_with("&scope="), "got {url}");
    }

    #[test]
    fn state_is_url_safe_and_random() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 43);
        assert!(
            a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe: {a}"
        );
        assert_ne!(a, b, "two states should not collide");
    }
}
