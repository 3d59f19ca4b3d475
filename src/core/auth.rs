use serde::{Deserialize, Serialize};

/// Login credentials, held in memory only. Never written to disk.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// The password stays out of debug logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Both fields must be non-empty before any network call is made.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

/// User record returned by the login endpoint. The shape is server-defined;
/// only `isActive` drives behavior here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("user")
    }
}

/// Outcome of one login attempt. Every variant maps to a caller decision;
/// nothing here retries on its own.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(UserRecord),
    /// The account must not be used further. Fatal to the application.
    Blocked,
    InvalidCredentials,
    ServerError(u16),
    /// The endpoint could not be reached at all. The caller may continue in
    /// a degraded offline mode with no session.
    Unreachable,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Classify a login response from its HTTP status and body.
///
/// A 401 whose `error` message mentions a blocked account is distinguished
/// from plain bad credentials; the server reports it both in English and in
/// Portuguese ("bloqueada") depending on version.
pub fn classify_login(status: u16, body: &str) -> LoginOutcome {
    match status {
        200 => match serde_json::from_str::<UserRecord>(body) {
            Ok(user) if user.is_active == Some(false) => LoginOutcome::Blocked,
            Ok(user) => LoginOutcome::Authenticated(user),
            Err(_) => LoginOutcome::ServerError(status),
        },
        401 => {
            let blocked = serde_json::from_str::<ErrorBody>(body)
                .map(|e| {
                    let message = e.error.to_lowercase();
                    message.contains("blocked") || message.contains("bloqueada")
                })
                .unwrap_or(false);
            if blocked {
                LoginOutcome::Blocked
            } else {
                LoginOutcome::InvalidCredentials
            }
        }
        other => LoginOutcome::ServerError(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_user_is_authenticated() {
        let body = r#"{"username":"ana","name":"Ana","isActive":true,"role":"seller"}"#;
        match classify_login(200, body) {
            LoginOutcome::Authenticated(user) => {
                assert_eq!(user.display_name(), "Ana");
                assert_eq!(user.is_active, Some(true));
                assert!(user.extra.contains_key("role"));
            }
            other => panic!("expected Authenticated, got {other:?}"),
        }
    }

    #[test]
    fn missing_is_active_field_still_authenticates() {
        match classify_login(200, r#"{"username":"ana"}"#) {
            LoginOutcome::Authenticated(user) => assert_eq!(user.is_active, None),
            other => panic!("expected Authenticated, got {other:?}"),
        }
    }

    #[test]
    fn inactive_user_is_blocked() {
        let outcome = classify_login(200, r#"{"username":"ana","isActive":false}"#);
        assert!(matches!(outcome, LoginOutcome::Blocked));
    }

    #[test]
    fn unauthorized_with_blocked_message_is_blocked() {
        let outcome = classify_login(401, r#"{"error":"Conta bloqueada pelo administrador"}"#);
        assert!(matches!(outcome, LoginOutcome::Blocked));

        let outcome = classify_login(401, r#"{"error":"Account BLOCKED"}"#);
        assert!(matches!(outcome, LoginOutcome::Blocked));
    }

    #[test]
    fn unauthorized_otherwise_is_invalid_credentials() {
        let outcome = classify_login(401, r#"{"error":"Senha incorreta"}"#);
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));

        let outcome = classify_login(401, "not json at all");
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials));
    }

    #[test]
    fn other_statuses_are_server_errors() {
        assert!(matches!(
            classify_login(500, ""),
            LoginOutcome::ServerError(500)
        ));
        assert!(matches!(
            classify_login(200, "<html>maintenance</html>"),
            LoginOutcome::ServerError(200)
        ));
    }

    #[test]
    fn empty_fields_are_incomplete() {
        assert!(!Credentials::new("".into(), "x".into()).is_complete());
        assert!(!Credentials::new("x".into(), "  ".into()).is_complete());
        assert!(Credentials::new("x".into(), "y".into()).is_complete());
    }
}
