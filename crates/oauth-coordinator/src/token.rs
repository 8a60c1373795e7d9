use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::OauthError;

#[derive(Debug, Clone, Serialize)]
pub struct OauthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: Option<u64>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    expires_in: Option<u64>,
}

impl From<TokenResponse> for OauthTokens {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response.expires_in.map(|seconds| {
            let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            now + seconds
        });
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type,
            expires_at,
        }
    }
}

pub async fn exchange_code(
    http: &reqwest::Client,
    token_endpoint: &str,
    client_id: &str,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<OauthTokens, OauthError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", client_id),
        ("code_verifier", code_verifier),
    ];
    post_token_request(http, token_endpoint, &params).await
}

pub async fn exchange_refresh_token(
    http: &reqwest::Client,
    token_endpoint: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<OauthTokens, OauthError> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client_id),
    ];
    let mut tokens = post_token_request(http, token_endpoint, &params).await?;
    // §4.J: retain the old refresh token when the server omits one in the response.
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_string());
    }
    Ok(tokens)
}

async fn post_token_request(
    http: &reqwest::Client,
    token_endpoint: &str,
    params: &[(&str, &str)],
) -> Result<OauthTokens, OauthError> {
    let response = http.post(token_endpoint).form(params).send().await.map_err(OauthError::TokenExchange)?;
    if !response.status().is_success() {
        return Err(OauthError::TokenExchangeStatus(response.status().as_u16()));
    }
    let parsed: TokenResponse = response.json().await.map_err(OauthError::TokenExchange)?;
    Ok(parsed.into())
}
