use std::time::Duration;

use reqwest::redirect::Policy;
use serde::Deserialize;

use crate::http::app::Protocol;

/// Settings shared by every request issued through one factory or agent.
///
/// Deserializes from the same camelCase shape test fixtures use, with every
/// field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Speak HTTP/2 with prior knowledge instead of HTTP/1.1.
    pub http2: bool,
    /// Accept self-signed certificates, e.g. from a local TLS test server.
    pub accept_invalid_certs: bool,
    /// Whole-request timeout applied to every request.
    pub timeout_ms: Option<u64>,
}

impl Options {
    pub fn http2() -> Self {
        Self {
            http2: true,
            ..Self::default()
        }
    }

    pub fn protocol(&self) -> Protocol {
        if self.http2 { Protocol::Http2 } else { Protocol::Http1 }
    }

    /// Builds the transport client. Redirects are always followed by hand so
    /// session hooks see every hop.
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, String> {
        let mut builder = reqwest::Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if self.http2 {
            builder = builder.http2_prior_knowledge();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))
    }
}
