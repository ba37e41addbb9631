//! HTTP clients for the remote seat, payment and allocation services.
//!
//! Every operation is a JSON `POST`. A 2xx answer carries a
//! [`TransactionResult`]; anything else carries an [`ErrorBody`] whose
//! message becomes the rejection reason.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use saga_common::{BookingId, ErrorBody, PaymentDetails, TransactionResult};
use serde::Serialize;

use super::{AllocationService, PaymentService, SeatService};
use crate::error::ServiceError;

#[derive(Serialize)]
struct BookingRef {
    booking_id: BookingId,
}

#[derive(Serialize)]
struct BlockSeatRequest<'a> {
    booking_id: BookingId,
    flight_number: &'a str,
    seat_number: &'a str,
}

#[derive(Serialize)]
struct ProcessPaymentRequest<'a> {
    booking_id: BookingId,
    #[serde(flatten)]
    payment: &'a PaymentDetails,
}

#[derive(Serialize)]
struct AllocateSeatRequest<'a> {
    booking_id: BookingId,
    flight_number: &'a str,
    seat_number: &'a str,
    passenger_name: &'a str,
}

/// Shared JSON transport for one remote service.
#[derive(Debug, Clone)]
struct JsonEndpoint {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl JsonEndpoint {
    fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TransactionResult, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "Calling collaborator");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let body = ErrorBody::from_slice(&bytes);
            return Err(ServiceError::rejected(status.as_u16(), body.message));
        }

        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Malformed {
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout {
                after: self.timeout,
            }
        } else {
            ServiceError::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

/// Seat service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSeatClient {
    endpoint: JsonEndpoint,
}

impl HttpSeatClient {
    /// Creates a client for the seat service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SeatService for HttpSeatClient {
    async fn block(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
    ) -> Result<TransactionResult, ServiceError> {
        let request = BlockSeatRequest {
            booking_id,
            flight_number,
            seat_number,
        };
        self.endpoint.post("/api/seats/block", &request).await
    }

    async fn release(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.endpoint
            .post("/api/seats/release", &BookingRef { booking_id })
            .await
    }
}

/// Payment service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPaymentClient {
    endpoint: JsonEndpoint,
}

impl HttpPaymentClient {
    /// Creates a client for the payment service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PaymentService for HttpPaymentClient {
    async fn process(
        &self,
        booking_id: BookingId,
        payment: &PaymentDetails,
    ) -> Result<TransactionResult, ServiceError> {
        let request = ProcessPaymentRequest {
            booking_id,
            payment,
        };
        self.endpoint.post("/api/payments/process", &request).await
    }

    async fn refund(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.endpoint
            .post("/api/payments/refund", &BookingRef { booking_id })
            .await
    }
}

/// Allocation service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAllocationClient {
    endpoint: JsonEndpoint,
}

impl HttpAllocationClient {
    /// Creates a client for the allocation service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            endpoint: JsonEndpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl AllocationService for HttpAllocationClient {
    async fn allocate(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
        passenger_name: &str,
    ) -> Result<TransactionResult, ServiceError> {
        let request = AllocateSeatRequest {
            booking_id,
            flight_number,
            seat_number,
            passenger_name,
        };
        self.endpoint
            .post("/api/allocations/allocate", &request)
            .await
    }

    async fn cancel(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.endpoint
            .post("/api/allocations/cancel", &BookingRef { booking_id })
            .await
    }
}
