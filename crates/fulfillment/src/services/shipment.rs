//! Shipment carrier client and in-memory stub.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{ShippingAddresses, ShippingStatus};
use serde::{Deserialize, Serialize};

use crate::services::AdapterError;

/// A carrier reservation: an opaque id plus the reserved slot time in unix
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reservation {
    pub reserve_id: String,
    pub reserve_time: i64,
}

/// Client for the shipment carrier.
#[async_trait]
pub trait ShipmentClient: Send + Sync {
    /// Reserves a shipment slot between the two addresses.
    async fn create_reservation(
        &self,
        addresses: &ShippingAddresses,
    ) -> Result<Reservation, AdapterError>;

    /// Requests pickup for a reservation and returns the raw label image.
    async fn request_handoff(&self, reserve_id: &str) -> Result<Vec<u8>, AdapterError>;

    /// Asks the carrier where a reservation currently stands.
    async fn query_status(&self, reserve_id: &str) -> Result<ShippingStatus, AdapterError>;
}

#[derive(Serialize)]
struct ReserveIdReq<'a> {
    reserve_id: &'a str,
}

#[derive(Deserialize)]
struct ShipmentStatusRes {
    status: ShippingStatus,
}

/// HTTP client for the shipment service.
///
/// All three endpoints require the fixed bearer credential. The timeout is
/// whatever the shared [`reqwest::Client`] was built with.
#[derive(Clone)]
pub struct HttpShipmentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpShipmentClient {
    /// Creates a client against the given service base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, AdapterError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::transport("shipment", e))?;

        if !response.status().is_success() {
            return Err(AdapterError::Status {
                service: "shipment",
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ShipmentClient for HttpShipmentClient {
    async fn create_reservation(
        &self,
        addresses: &ShippingAddresses,
    ) -> Result<Reservation, AdapterError> {
        self.post("/create", addresses)
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::malformed("shipment", e))
    }

    async fn request_handoff(&self, reserve_id: &str) -> Result<Vec<u8>, AdapterError> {
        let response = self.post("/request", &ReserveIdReq { reserve_id }).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdapterError::transport("shipment", e))?;
        Ok(bytes.to_vec())
    }

    async fn query_status(&self, reserve_id: &str) -> Result<ShippingStatus, AdapterError> {
        let body: ShipmentStatusRes = self
            .post("/status", &ReserveIdReq { reserve_id })
            .await?
            .json()
            .await
            .map_err(|e| AdapterError::malformed("shipment", e))?;
        Ok(body.status)
    }
}

#[derive(Debug)]
struct StubShipmentState {
    next_reserve: u32,
    carrier_status: ShippingStatus,
    label: Vec<u8>,
    fail_on_create: bool,
    fail_on_request: bool,
    fail_on_status: bool,
    create_calls: u32,
    request_calls: u32,
    status_calls: u32,
}

impl Default for StubShipmentState {
    fn default() -> Self {
        Self {
            next_reserve: 0,
            carrier_status: ShippingStatus::Initial,
            label: b"\x89PNG stub label".to_vec(),
            fail_on_create: false,
            fail_on_request: false,
            fail_on_status: false,
            create_calls: 0,
            request_calls: 0,
            status_calls: 0,
        }
    }
}

/// In-memory carrier for testing.
///
/// Hands out sequential reservation ids and reports whatever carrier status
/// the test last configured.
#[derive(Debug, Clone, Default)]
pub struct StubShipmentClient {
    state: Arc<RwLock<StubShipmentState>>,
}

impl StubShipmentClient {
    /// Creates a stub carrier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the status reported to subsequent query calls.
    pub fn set_carrier_status(&self, status: ShippingStatus) {
        self.state.write().unwrap().carrier_status = status;
    }

    /// Configures the label bytes returned by pickup requests.
    pub fn set_label(&self, label: Vec<u8>) {
        self.state.write().unwrap().label = label;
    }

    /// Makes subsequent create calls fail at the transport level.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes subsequent pickup requests fail at the transport level.
    pub fn set_fail_on_request(&self, fail: bool) {
        self.state.write().unwrap().fail_on_request = fail;
    }

    /// Makes subsequent status queries fail at the transport level.
    pub fn set_fail_on_status(&self, fail: bool) {
        self.state.write().unwrap().fail_on_status = fail;
    }

    /// Number of reservations created.
    pub fn create_count(&self) -> u32 {
        self.state.read().unwrap().create_calls
    }

    /// Number of pickup requests observed.
    pub fn request_count(&self) -> u32 {
        self.state.read().unwrap().request_calls
    }

    /// Number of status queries observed.
    pub fn status_count(&self) -> u32 {
        self.state.read().unwrap().status_calls
    }
}

#[async_trait]
impl ShipmentClient for StubShipmentClient {
    async fn create_reservation(
        &self,
        _addresses: &ShippingAddresses,
    ) -> Result<Reservation, AdapterError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(AdapterError::Transport {
                service: "shipment",
                reason: "connection refused".to_string(),
            });
        }
        state.create_calls += 1;
        state.next_reserve += 1;
        Ok(Reservation {
            reserve_id: format!("RSV-{:04}", state.next_reserve),
            reserve_time: 1_700_000_000 + i64::from(state.next_reserve),
        })
    }

    async fn request_handoff(&self, _reserve_id: &str) -> Result<Vec<u8>, AdapterError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_request {
            return Err(AdapterError::Transport {
                service: "shipment",
                reason: "connection refused".to_string(),
            });
        }
        state.request_calls += 1;
        Ok(state.label.clone())
    }

    async fn query_status(&self, _reserve_id: &str) -> Result<ShippingStatus, AdapterError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_status {
            return Err(AdapterError::Transport {
                service: "shipment",
                reason: "connection refused".to_string(),
            });
        }
        state.status_calls += 1;
        Ok(state.carrier_status)
    }
}
