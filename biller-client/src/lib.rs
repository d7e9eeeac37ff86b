//! # Biller Client SDK
//!
//! A typed Rust client for the H2H biller API. Requests are signed with the
//! shared secret before they are sent.

use biller_types::security::{inquiry_checksum, payment_checksum};
use biller_types::{BillerResponse, InquiryRequest, PaymentRequest};
use reqwest::Client;
use serde::Serialize;

/// Header the gateway keys its rate limiter on.
const COLLECTING_AGENT_HEADER: &str = "X-Collecting-Agent";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {rc} - {message}")]
    Api {
        status: u16,
        rc: String,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// H2H biller API client.
pub struct BillerClient {
    base_url: String,
    secret: String,
    collecting_agent: Option<String>,
    http: Client,
}

impl BillerClient {
    /// Creates a new client that signs requests with `secret`.
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            collecting_agent: None,
            http: Client::new(),
        }
    }

    /// Sends `X-Collecting-Agent` with every request.
    pub fn with_collecting_agent(mut self, agent: impl Into<String>) -> Self {
        self.collecting_agent = Some(agent.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Sends an Inquiry, filling in the checksum when absent.
    pub async fn inquiry(&self, mut req: InquiryRequest) -> Result<BillerResponse, ClientError> {
        if req.checksum.is_none() {
            self.sign_inquiry(&mut req);
        }
        self.post("/inquiry", &req).await
    }

    /// Sends a Payment, filling in the checksum when absent.
    pub async fn payment(&self, mut req: PaymentRequest) -> Result<BillerResponse, ClientError> {
        if req.inquiry.checksum.is_none() {
            self.sign_payment(&mut req);
        }
        self.post("/payment", &req).await
    }

    /// Sets the Inquiry checksum from the request fields.
    pub fn sign_inquiry(&self, req: &mut InquiryRequest) {
        req.checksum = Some(inquiry_checksum(
            field(&req.nomor_pembayaran),
            &self.secret,
            field(&req.tanggal_transaksi),
        ));
    }

    /// Sets the Payment checksum from the request fields.
    pub fn sign_payment(&self, req: &mut PaymentRequest) {
        req.inquiry.checksum = Some(payment_checksum(
            field(&req.inquiry.nomor_pembayaran),
            &self.secret,
            field(&req.inquiry.tanggal_transaksi),
            field(&req.total_nominal),
            field(&req.nomor_jurnal_pembukuan),
        ));
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<BillerResponse, ClientError> {
        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(agent) = &self.collecting_agent {
            req = req.header(COLLECTING_AGENT_HEADER, agent);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    /// Maps any response whose `rc` is not `OK` to [`ClientError::Api`],
    /// including the ones the gateway delivers with HTTP 200.
    async fn handle_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<BillerResponse, ClientError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        match serde_json::from_str::<BillerResponse>(&body) {
            Ok(response) if response.is_ok() => Ok(response),
            Ok(response) => Err(ClientError::Api {
                status,
                rc: response.rc.to_string(),
                message: response.message,
            }),
            Err(e) if (200..300).contains(&status) => Err(ClientError::Json(e)),
            Err(_) => Err(ClientError::Api {
                status,
                rc: "UNKNOWN".to_string(),
                message: body,
            }),
        }
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}
