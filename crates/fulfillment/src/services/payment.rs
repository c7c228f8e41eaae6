//! Payment service client and in-memory stub.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Price;
use serde::{Deserialize, Serialize};

use crate::services::AdapterError;

/// Answer of the payment service to an authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    /// Authorized.
    Ok,
    /// Declined: the card details are wrong.
    Invalid,
    /// Declined: the card balance is insufficient.
    Fail,
}

/// Client for the payment authorizer.
///
/// A returned [`AuthorizationStatus`] means the service was reached and gave
/// an answer; "could not ask" is always an [`AdapterError`].
#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Asks the service to authorize `price` against a one-time card token.
    async fn authorize(
        &self,
        shop_id: &str,
        token: &str,
        price: Price,
    ) -> Result<AuthorizationStatus, AdapterError>;
}

#[derive(Serialize)]
struct PaymentTokenReq<'a> {
    shop_id: &'a str,
    token: &'a str,
    api_key: &'a str,
    price: i64,
}

#[derive(Deserialize)]
struct PaymentTokenRes {
    status: AuthorizationStatus,
}

/// HTTP client for the payment service.
///
/// Posts to `{base}/token`. The api key is deployment configuration and
/// travels in the request body per the service's contract. The timeout is
/// whatever the shared [`reqwest::Client`] was built with.
#[derive(Clone)]
pub struct HttpPaymentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentClient {
    /// Creates a client against the given service base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PaymentClient for HttpPaymentClient {
    async fn authorize(
        &self,
        shop_id: &str,
        token: &str,
        price: Price,
    ) -> Result<AuthorizationStatus, AdapterError> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .json(&PaymentTokenReq {
                shop_id,
                token,
                api_key: &self.api_key,
                price: price.get(),
            })
            .send()
            .await
            .map_err(|e| AdapterError::transport("payment", e))?;

        if !response.status().is_success() {
            return Err(AdapterError::Status {
                service: "payment",
                status: response.status().as_u16(),
            });
        }

        let body: PaymentTokenRes = response
            .json()
            .await
            .map_err(|e| AdapterError::malformed("payment", e))?;
        Ok(body.status)
    }
}

#[derive(Debug)]
struct StubPaymentState {
    status: AuthorizationStatus,
    unreachable: bool,
    calls: Vec<(String, i64)>,
}

impl Default for StubPaymentState {
    fn default() -> Self {
        Self {
            status: AuthorizationStatus::Ok,
            unreachable: false,
            calls: Vec::new(),
        }
    }
}

/// In-memory payment client for testing.
#[derive(Debug, Clone, Default)]
pub struct StubPaymentClient {
    state: Arc<RwLock<StubPaymentState>>,
}

impl StubPaymentClient {
    /// Creates a stub that authorizes everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the answer returned to subsequent authorize calls.
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.state.write().unwrap().status = status;
    }

    /// Makes subsequent calls fail at the transport level.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unwrap().unreachable = unreachable;
    }

    /// Number of authorize calls observed.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().calls.len()
    }

    /// The token of the most recent authorize call.
    pub fn last_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap()
            .calls
            .last()
            .map(|(token, _)| token.clone())
    }
}

#[async_trait]
impl PaymentClient for StubPaymentClient {
    async fn authorize(
        &self,
        _shop_id: &str,
        token: &str,
        price: Price,
    ) -> Result<AuthorizationStatus, AdapterError> {
        let mut state = self.state.write().unwrap();
        if state.unreachable {
            return Err(AdapterError::Transport {
                service: "payment",
                reason: "connection refused".to_string(),
            });
        }
        state.calls.push((token.to_string(), price.get()));
        Ok(state.status)
    }
}
