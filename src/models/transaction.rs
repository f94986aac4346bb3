// models/transaction.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "created",
            TransactionStatus::Authorized => "authorized",
            TransactionStatus::Captured => "captured",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Failed => "failed",
        }
    }
}

// One gateway order / payment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<ObjectId>,

    pub order_id: String,
    pub payment_id: Option<String>,
    pub signature: Option<String>,

    // Amount in minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,

    pub status: TransactionStatus,
    pub error_code: Option<String>,

    pub refund_id: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_status: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentTransaction {
    pub fn new(
        user: ObjectId,
        booking: Option<ObjectId>,
        room: Option<ObjectId>,
        order_id: String,
        amount: i64,
        currency: String,
        receipt: String,
    ) -> Self {
        let now = Utc::now();
        PaymentTransaction {
            id: Some(ObjectId::new()),
            user,
            booking,
            room,
            order_id,
            payment_id: None,
            signature: None,
            amount,
            currency,
            receipt,
            status: TransactionStatus::Created,
            error_code: None,
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Moves the transaction to `captured`. Safe under duplicate delivery:
    /// a transaction that is already captured is left untouched. Returns
    /// whether anything changed.
    pub fn apply_captured(&mut self, payment_id: &str, now: DateTime<Utc>) -> bool {
        if self.status == TransactionStatus::Captured {
            return false;
        }
        self.status = TransactionStatus::Captured;
        self.payment_id = Some(payment_id.to_string());
        self.error_code = None;
        self.completed_at = Some(now);
        self.updated_at = now;
        true
    }

    /// `payment.authorized` only ever advances a freshly created order;
    /// out-of-order delivery after capture or failure is ignored.
    pub fn apply_authorized(&mut self, payment_id: &str, now: DateTime<Utc>) -> bool {
        if self.status != TransactionStatus::Created {
            return false;
        }
        self.status = TransactionStatus::Authorized;
        self.payment_id = Some(payment_id.to_string());
        self.updated_at = now;
        true
    }

    /// `payment.failed` never demotes a captured transaction.
    pub fn apply_failed(&mut self, error_code: Option<String>, now: DateTime<Utc>) -> bool {
        if self.status == TransactionStatus::Captured
            || self.status == TransactionStatus::Refunded
            || self.status == TransactionStatus::Failed
        {
            return false;
        }
        self.status = TransactionStatus::Failed;
        self.error_code = error_code;
        self.updated_at = now;
        true
    }

    pub fn apply_refund_created(
        &mut self,
        refund_id: &str,
        refund_amount: Option<i64>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.refund_id.as_deref() == Some(refund_id)
            && self.refund_status.as_deref() == Some("created")
        {
            return false;
        }
        self.refund_id = Some(refund_id.to_string());
        self.refund_amount = refund_amount;
        self.refund_status = Some("created".to_string());
        self.updated_at = now;
        true
    }

    pub fn apply_refund_processed(&mut self, refund_id: &str, now: DateTime<Utc>) -> bool {
        if self.status == TransactionStatus::Refunded {
            return false;
        }
        self.refund_id = Some(refund_id.to_string());
        self.refund_status = Some("processed".to_string());
        self.status = TransactionStatus::Refunded;
        self.updated_at = now;
        true
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub refund_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentTransaction> for TransactionResponse {
    fn from(tx: PaymentTransaction) -> Self {
        TransactionResponse {
            id: tx.id.map(|id| id.to_hex()).unwrap_or_default(),
            order_id: tx.order_id,
            payment_id: tx.payment_id,
            amount: tx.amount,
            currency: tx.currency,
            status: tx.status,
            refund_status: tx.refund_status,
            created_at: tx.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> PaymentTransaction {
        PaymentTransaction::new(
            ObjectId::new(),
            None,
            None,
            "order_MkWd7PqXjZl4Qb".to_string(),
            1500000,
            "INR".to_string(),
            "rcpt_1".to_string(),
        )
    }

    #[test]
    fn capture_is_idempotent() {
        let mut t = tx();
        let now = Utc::now();

        assert!(t.apply_captured("pay_29QQoUBi66xm2f", now));
        assert_eq!(t.status, TransactionStatus::Captured);

        // Duplicate webhook delivery leaves everything unchanged
        assert!(!t.apply_captured("pay_29QQoUBi66xm2f", now));
        assert_eq!(t.payment_id.as_deref(), Some("pay_29QQoUBi66xm2f"));
        assert_eq!(t.status, TransactionStatus::Captured);
    }

    #[test]
    fn authorized_does_not_demote_captured() {
        let mut t = tx();
        let now = Utc::now();

        t.apply_captured("pay_1", now);
        assert!(!t.apply_authorized("pay_1", now));
        assert_eq!(t.status, TransactionStatus::Captured);
    }

    #[test]
    fn failed_after_capture_is_ignored() {
        let mut t = tx();
        let now = Utc::now();

        t.apply_captured("pay_1", now);
        assert!(!t.apply_failed(Some("BAD_GATEWAY".to_string()), now));
        assert_eq!(t.status, TransactionStatus::Captured);
        assert!(t.error_code.is_none());
    }

    #[test]
    fn failure_then_capture_recovers() {
        let mut t = tx();
        let now = Utc::now();

        t.apply_failed(Some("SIGNATURE_VERIFICATION_FAILED".to_string()), now);
        assert_eq!(t.status, TransactionStatus::Failed);

        assert!(t.apply_captured("pay_1", now));
        assert_eq!(t.status, TransactionStatus::Captured);
        assert!(t.error_code.is_none());
    }

    #[test]
    fn refund_lifecycle() {
        let mut t = tx();
        let now = Utc::now();

        t.apply_captured("pay_1", now);
        assert!(t.apply_refund_created("rfnd_1", Some(1500000), now));
        assert!(!t.apply_refund_created("rfnd_1", Some(1500000), now));
        assert_eq!(t.status, TransactionStatus::Captured);

        assert!(t.apply_refund_processed("rfnd_1", now));
        assert_eq!(t.status, TransactionStatus::Refunded);
        assert!(!t.apply_refund_processed("rfnd_1", now));
    }
}
