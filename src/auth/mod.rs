//! # Authentication
//!
//! Credentials attached to every hop of an outgoing request. Agents carry a
//! default method that each request inherits; a request can replace it.

/// Supported authentication methods.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    #[default]
    None,
    BearerToken {
        token: String,
    },
    BasicAuth {
        username: String,
        password: Option<String>,
    },
}

impl AuthMethod {
    pub(crate) fn apply(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            AuthMethod::None => req_builder,
            AuthMethod::BearerToken { token } => req_builder.bearer_auth(token),
            AuthMethod::BasicAuth { username, password } => {
                req_builder.basic_auth(username, password.as_deref())
            }
        }
    }
}
