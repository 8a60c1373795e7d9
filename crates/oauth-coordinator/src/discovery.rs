use serde::{Deserialize, Serialize};

use crate::OauthError;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub registration_endpoint: Option<String>,
}

/// `GET {serverUrl}/.well-known/oauth-authorization-server`.
pub async fn discover(http: &reqwest::Client, server_url: &str) -> Result<AuthorizationServerMetadata, OauthError> {
    let url = format!("{}/.well-known/oauth-authorization-server", server_url.trim_end_matches('/'));
    let response = http.get(&url).send().await.map_err(OauthError::Discovery)?;
    if !response.status().is_success() {
        return Err(OauthError::DiscoveryStatus(response.status().as_u16()));
    }
    response.json().await.map_err(OauthError::Discovery)
}

#[derive(Serialize)]
struct RegistrationRequest<'a> {
    redirect_uris: &'a [String],
}

#[derive(Deserialize)]
struct RegistrationResponse {
    client_id: String,
}

/// Dynamic client registration (RFC 7591), attempted when the server
/// advertises a `registration_endpoint`.
pub async fn register_client(
    http: &reqwest::Client,
    registration_endpoint: &str,
    redirect_uri: &str,
) -> Result<String, OauthError> {
    let body = RegistrationRequest { redirect_uris: &[redirect_uri.to_string()] };
    let response = http
        .post(registration_endpoint)
        .json(&body)
        .send()
        .await
        .map_err(OauthError::Discovery)?;
    if !response.status().is_success() {
        return Err(OauthError::DiscoveryStatus(response.status().as_u16()));
    }
    let parsed: RegistrationResponse = response.json().await.map_err(OauthError::Discovery)?;
    Ok(parsed.client_id)
}
