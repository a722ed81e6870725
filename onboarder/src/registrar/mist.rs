//! Juniper Mist API client.

use std::time::Duration;

use log::{debug, info};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{Adoption, Registrar};
use crate::config::OrgContext;
use crate::error::{ConfigError, RegistrationError};
use crate::script::AdoptionScript;

/// Longest slice of a response body carried into an error.
const BODY_SNIPPET: usize = 200;

/// Body of `GET /orgs/{org}/ocdevices/outbound_ssh_cmd`.
#[derive(Debug, Deserialize)]
struct OutboundSshCmd {
    cmd: String,
}

/// Body of `POST /orgs/{org}/inventory`.
#[derive(Debug, Default, Deserialize)]
struct ClaimResponse {
    #[serde(default)]
    added: Vec<String>,
    #[serde(default)]
    duplicated: Vec<String>,
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    inventory_added: Vec<InventoryItem>,
}

#[derive(Debug, Deserialize)]
struct InventoryItem {
    id: Option<String>,
    serial: Option<String>,
}

/// Registrar backed by the Mist REST API.
///
/// The token travels in a default `Authorization: Token ...` header marked
/// sensitive, so it never shows up in request debug output.
#[derive(Debug)]
pub struct MistRegistrar {
    client: Client,
    org: OrgContext,
}

impl MistRegistrar {
    /// Build a registrar for `org` with a per-request timeout.
    pub fn new(org: OrgContext, timeout: Duration) -> Result<Self, ConfigError> {
        let mut auth = HeaderValue::from_str(&format!("Token {}", org.token.expose_secret()))
            .map_err(|_| ConfigError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, org })
    }

    fn org_url(&self, path: &str) -> String {
        format!("{}/orgs/{}{}", self.org.api_url, self.org.org_id, path)
    }

    /// Fetch the configuration that makes a switch dial home to this org.
    pub async fn fetch_adoption_script(&self) -> Result<AdoptionScript, RegistrationError> {
        let url = self.org_url("/ocdevices/outbound_ssh_cmd");
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(transient)?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(response, None).await);
        }

        let body: OutboundSshCmd = response.json().await.map_err(|e| decode(status, e))?;
        let script = AdoptionScript::from_text(&body.cmd);
        if script.is_empty() {
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                message: "adoption command is empty".to_string(),
            });
        }

        info!("Fetched adoption script ({} commands)", script.len());
        Ok(script)
    }
}

impl Registrar for MistRegistrar {
    async fn adopt(&self, identifier: &str) -> Result<Adoption, RegistrationError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(RegistrationError::EmptyIdentifier);
        }

        let url = self.org_url("/inventory");
        debug!("POST {} [{}]", url, identifier);

        let response = self
            .client
            .post(&url)
            .json(&[identifier])
            .send()
            .await
            .map_err(transient)?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(response, Some(identifier)).await);
        }

        let body: ClaimResponse = response.json().await.map_err(|e| decode(status, e))?;
        interpret_claim(status, &body, identifier)
    }
}

/// Map a successful claim response onto the outcome for `identifier`.
fn interpret_claim(
    status: StatusCode,
    body: &ClaimResponse,
    identifier: &str,
) -> Result<Adoption, RegistrationError> {
    let listed = |list: &[String]| list.iter().any(|s| s.eq_ignore_ascii_case(identifier));

    if listed(&body.duplicated) {
        return Err(RegistrationError::Conflict {
            identifier: identifier.to_string(),
        });
    }
    if listed(&body.error) {
        return Err(RegistrationError::Rejected {
            status: status.as_u16(),
            message: format!("claim of '{identifier}' reported as an error"),
        });
    }

    let item = body.inventory_added.iter().find(|item| {
        item.serial
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(identifier))
    });

    match item {
        Some(item) => Ok(Adoption {
            device_id: item.id.clone().unwrap_or_else(|| identifier.to_string()),
        }),
        None if listed(&body.added) => Ok(Adoption {
            device_id: identifier.to_string(),
        }),
        None => Err(RegistrationError::Rejected {
            status: status.as_u16(),
            message: format!("'{identifier}' not reported as added"),
        }),
    }
}

/// Classify a non-success status code.
fn classify_status(status: StatusCode, body: &str, identifier: Option<&str>) -> RegistrationError {
    let snippet: String = body.trim().chars().take(BODY_SNIPPET).collect();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RegistrationError::Auth {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => RegistrationError::NotFound {
            message: if snippet.is_empty() {
                "organization or endpoint not found".to_string()
            } else {
                snippet
            },
        },
        StatusCode::CONFLICT => match identifier {
            Some(identifier) => RegistrationError::Conflict {
                identifier: identifier.to_string(),
            },
            None => RegistrationError::Rejected {
                status: status.as_u16(),
                message: snippet,
            },
        },
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            RegistrationError::Transient {
                message: format!("HTTP {}", s.as_u16()),
            }
        }
        s => RegistrationError::Rejected {
            status: s.as_u16(),
            message: snippet,
        },
    }
}

async fn failure(response: Response, identifier: Option<&str>) -> RegistrationError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_status(status, &body, identifier)
}

fn transient(err: reqwest::Error) -> RegistrationError {
    // Strip the URL; it is already in the debug log
    RegistrationError::Transient {
        message: err.without_url().to_string(),
    }
}

fn decode(status: StatusCode, err: reqwest::Error) -> RegistrationError {
    if err.is_decode() {
        RegistrationError::Rejected {
            status: status.as_u16(),
            message: format!("unexpected response body: {}", err.without_url()),
        }
    } else {
        transient(err)
    }
}
