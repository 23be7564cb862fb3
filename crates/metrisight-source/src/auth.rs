// Credentials for the metrics source
// owned by the caller and passed per call, never stored by the client

use std::fmt;

use reqwest::RequestBuilder;
use serde::Deserialize;

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
}

impl Auth {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Scheme name, safe to log.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer { .. } => "bearer",
            Self::Basic { .. } => "basic",
        }
    }

    // attach the Authorization header, if any
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Bearer { token } => request.bearer_auth(token),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

// hand-written so secrets never end up in logs or panic messages
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"<redacted>").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let bearer = format!("{:?}", Auth::bearer("my-secret-token"));
        assert!(!bearer.contains("my-secret-token"));
        assert!(bearer.contains("<redacted>"));

        let basic = format!("{:?}", Auth::basic("admin", "password123"));
        assert!(basic.contains("admin"));
        assert!(!basic.contains("password123"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            auth: Auth,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
[auth]
type = "basic"
username = "admin"
password = "password123"
"#,
        )
        .unwrap();
        assert_eq!(parsed.auth, Auth::basic("admin", "password123"));

        let parsed: Wrapper = toml::from_str("auth = { type = \"none\" }").unwrap();
        assert_eq!(parsed.auth, Auth::None);
    }

    #[test]
    fn test_scheme() {
        assert_eq!(Auth::default().scheme(), "none");
        assert_eq!(Auth::bearer("t").scheme(), "bearer");
    }
}
