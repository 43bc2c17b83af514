//! Blocking HTTP client shared by the package-registry drivers

use std::time::Duration;

use reqwest::{StatusCode, Url};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("arm/", env!("CARGO_PKG_VERSION"));

/// JSON/bytes client bound to one registry, with optional header auth.
#[derive(Debug, Clone)]
pub struct HttpClient {
    registry: String,
    client: Client,
}

impl HttpClient {
    /// Build a client. `auth` is a header name and the environment variable
    /// holding its value; an unset variable means anonymous access.
    pub fn new(registry: &str, auth: Option<(&'static str, &str)>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some((header, var)) = auth {
            if let Some(token) = std::env::var(var).ok().filter(|t| !t.is_empty()) {
                let mut value = HeaderValue::from_str(&token).map_err(|_| Error::InvalidConfig {
                    registry: registry.to_string(),
                    message: format!("{var} contains characters not allowed in a header"),
                })?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_static(header), value);
            } else {
                tracing::debug!(registry, variable = var, "No token set, using anonymous access");
            }
        }

        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Unreachable {
                registry: registry.to_string(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            registry: registry.to_string(),
            client,
        })
    }

    /// GET a JSON document. A 404 is `Ok(None)`.
    pub fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<Option<T>> {
        let Some(response) = self.get(url)? else {
            return Ok(None);
        };
        response.json::<T>().map(Some).map_err(|e| Error::Unreachable {
            registry: self.registry.clone(),
            message: format!("invalid response from {url}: {e}"),
        })
    }

    /// GET raw bytes. A 404 is `Ok(None)`.
    pub fn get_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>> {
        let Some(response) = self.get(url)? else {
            return Ok(None);
        };
        response
            .bytes()
            .map(|b| Some(b.to_vec()))
            .map_err(|e| Error::Unreachable {
                registry: self.registry.clone(),
                message: format!("failed to read {url}: {e}"),
            })
    }

    fn get(&self, url: &Url) -> Result<Option<Response>> {
        tracing::debug!(registry = %self.registry, %url, "GET");
        let response = self.client.get(url.clone()).send().map_err(|e| Error::Unreachable {
            registry: self.registry.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        match status {
            s if s.is_success() => Ok(Some(response)),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::AuthFailed {
                registry: self.registry.clone(),
                message: format!("HTTP {} from {url}", status.as_u16()),
            }),
            _ => Err(Error::Unreachable {
                registry: self.registry.clone(),
                message: format!("HTTP {} from {url}", status.as_u16()),
            }),
        }
    }
}

/// Build an endpoint URL from a base, path segments and query pairs.
///
/// Segments are percent-encoded; an empty final segment yields a trailing
/// slash.
pub fn endpoint(registry: &str, base: &str, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let invalid = |message: String| Error::InvalidConfig {
        registry: registry.to_string(),
        message,
    };
    let mut url = Url::parse(base).map_err(|e| invalid(format!("invalid url '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("'{base}' cannot be used as a base url")))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_segments_and_query() {
        let url = endpoint(
            "r",
            "https://gitlab.example.com/",
            &["api", "v4", "projects", "group/proj", "packages"],
            &[("package_name", "my rules")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fproj/packages?package_name=my+rules"
        );
    }

    #[test]
    fn endpoint_trailing_slash() {
        let url = endpoint("r", "https://api.cloudsmith.io", &["v1", "packages", "o", "r", ""], &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.cloudsmith.io/v1/packages/o/r/");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(endpoint("r", "not a url", &[], &[]).is_err());
    }

    #[test]
    fn anonymous_client_builds() {
        HttpClient::new("r", Some(("x-api-key", "ARM_TEST_UNSET_TOKEN_VAR"))).unwrap();
    }
}
