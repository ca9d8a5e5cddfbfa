//! Stripe-backed payment processor

use axum::async_trait;
use serde::Deserialize;

use super::{PaymentProcessor, ProcessorCharge, ProcessorError, ProcessorRefund};

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

// Test token; real card collection happens client-side and is out of scope
// for this backend.
const CHARGE_SOURCE: &str = "tok_visa";

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    charge: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: String,
}

/// Processor talking to the Stripe charges and refunds endpoints
pub struct StripeProcessor {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl StripeProcessor {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    async fn rejection(response: reqwest::Response) -> ProcessorError {
        let status = response.status();
        match response.json::<StripeErrorBody>().await {
            Ok(body) if !body.error.message.is_empty() => {
                ProcessorError::Rejected(body.error.message)
            }
            _ => ProcessorError::Rejected(format!("Stripe returned status {}", status)),
        }
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    async fn charge(
        &self,
        amount_gr: i64,
        currency: &str,
    ) -> Result<ProcessorCharge, ProcessorError> {
        let response = self
            .http
            .post(format!("{}/charges", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&[
                ("amount", amount_gr.to_string()),
                ("currency", currency.to_string()),
                ("source", CHARGE_SOURCE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProcessorError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Unreachable(e.to_string()))?;

        Ok(ProcessorCharge {
            charge_id: charge.id,
            amount_gr: charge.amount,
            currency: charge.currency,
        })
    }

    async fn refund(&self, charge_id: &str) -> Result<ProcessorRefund, ProcessorError> {
        let response = self
            .http
            .post(format!("{}/refunds", self.base_url))
            .bearer_auth(&self.api_key)
            .form(&[("charge", charge_id.to_string())])
            .send()
            .await
            .map_err(|e| ProcessorError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let refund: RefundResponse = response
            .json()
            .await
            .map_err(|e| ProcessorError::Unreachable(e.to_string()))?;

        Ok(ProcessorRefund {
            refund_id: refund.id,
            charge_id: refund.charge,
        })
    }
}
