// services/razorpay_service.rs
use base64::{Engine as _, engine::general_purpose::STANDARD as base64};
use hmac::{Hmac, Mac};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{error, info};

use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

type ServiceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Serialize)]
pub struct OrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    pub contact: String,
    // "0" lets the gateway return the existing customer instead of erroring
    pub fail_existing: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayService {
    config: AppConfig,
    client: Client,
}

impl RazorpayService {
    pub fn new(config: AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        RazorpayService { config, client }
    }

    pub fn key_id(&self) -> &str {
        &self.config.razorpay_key_id
    }

    fn auth_header(&self) -> String {
        let auth_string = format!(
            "{}:{}",
            self.config.razorpay_key_id, self.config.razorpay_key_secret
        );
        format!("Basic {}", base64.encode(auth_string))
    }

    /// Creates a gateway order for `amount` minor units (paise).
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<OrderResponse, ServiceError> {
        info!("Creating Razorpay order: {} {} ({})", amount, currency, receipt);

        if amount <= 0 {
            return Err("Amount must be greater than 0".into());
        }

        let order_request = OrderRequest {
            amount,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
        };

        let url = format!("{}/orders", self.config.razorpay_base_url());
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&order_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!("Order creation failed: {} - {}", status, body);
            return Err(format!("Razorpay order creation failed: {}", status).into());
        }

        let order: OrderResponse = response.json().await?;
        info!("Order created: {}", order.id);
        Ok(order)
    }

    pub async fn create_customer(
        &self,
        name: &str,
        email: &str,
        contact: &str,
    ) -> Result<CustomerResponse, ServiceError> {
        info!("Creating Razorpay customer for {}", email);

        let customer_request = CustomerRequest {
            name: name.to_string(),
            email: email.to_string(),
            contact: contact.to_string(),
            fail_existing: "0".to_string(),
        };

        let url = format!("{}/customers", self.config.razorpay_base_url());
        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&customer_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!("Customer creation failed: {} - {}", status, body);
            return Err(format!("Razorpay customer creation failed: {}", status).into());
        }

        let customer: CustomerResponse = response.json().await?;
        info!("Customer created: {}", customer.id);
        Ok(customer)
    }

    /// Checkout signature check: HMAC-SHA256 over `"{order_id}|{payment_id}"`
    /// with the key secret, hex encoded, compared in constant time.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let message = format!("{}|{}", order_id, payment_id);
        verify_hmac_sha256(
            message.as_bytes(),
            self.config.razorpay_key_secret.as_bytes(),
            signature,
        )
    }

    /// Webhook signature check: HMAC-SHA256 over the raw request body with
    /// the webhook secret, against the `x-razorpay-signature` header.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        verify_hmac_sha256(
            payload,
            self.config.razorpay_webhook_secret.as_bytes(),
            signature,
        )
    }
}

fn verify_hmac_sha256(message: &[u8], secret: &[u8], expected_hex: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(message);
    let computed = hex::encode(mac.finalize().into_bytes());

    computed.as_bytes().ct_eq(expected_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(message: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn payment_signature_round_trip() {
        let secret = "test_key_secret";
        let signature = sign("order_abc|pay_xyz", secret);

        assert!(verify_hmac_sha256(
            b"order_abc|pay_xyz",
            secret.as_bytes(),
            &signature
        ));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let secret = "test_key_secret";
        let mut signature = sign("order_abc|pay_xyz", secret);
        signature.replace_range(0..1, if &signature[0..1] == "a" { "b" } else { "a" });

        assert!(!verify_hmac_sha256(
            b"order_abc|pay_xyz",
            secret.as_bytes(),
            &signature
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let signature = sign("order_abc|pay_xyz", "right_secret");

        assert!(!verify_hmac_sha256(
            b"order_abc|pay_xyz",
            b"wrong_secret",
            &signature
        ));
    }

    #[test]
    fn webhook_body_signature() {
        let secret = "whsec_123";
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        let signature = sign(std::str::from_utf8(body).unwrap(), secret);

        assert!(verify_hmac_sha256(body, secret.as_bytes(), &signature));
        assert!(!verify_hmac_sha256(b"{}", secret.as_bytes(), &signature));
    }
}
