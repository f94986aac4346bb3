use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PendingConfirmation,
    Partial,
    Completed,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::PendingConfirmation => "pending_confirmation",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

// Two-sided confirmation trail for payments settled outside the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfflinePaymentStatus {
    #[serde(default)]
    pub student_confirmed: bool,
    pub student_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner_confirmed: bool,
    pub owner_confirmed_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub order_id: Option<String>,
}

// Synthesized when the owner acknowledges receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingTransaction {
    pub order_id: String,
    pub amount: f64,
    pub method: String,
    pub paid_at: DateTime<Utc>,
}

// Database model for the bookings collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub student: ObjectId,
    pub owner: ObjectId,
    pub room: ObjectId,

    pub total_amount: f64,

    pub status: BookingStatus,
    pub payment_status: PaymentStatus,

    #[serde(default)]
    pub offline_payment: OfflinePaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<BookingTransaction>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(student: ObjectId, owner: ObjectId, room: ObjectId, total_amount: f64) -> Self {
        let now = Utc::now();
        Booking {
            id: Some(ObjectId::new()),
            student,
            owner,
            room,
            total_amount,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            offline_payment: OfflinePaymentStatus::default(),
            transaction: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner decision on a freshly requested booking. Only `pending`
    /// bookings can be accepted or rejected.
    pub fn decide(&mut self, accept: bool, now: DateTime<Utc>) -> Result<()> {
        if self.status != BookingStatus::Pending {
            return Err(AppError::conflict(format!(
                "Booking is {} and can no longer be decided",
                self.status.as_str()
            )));
        }

        self.status = if accept {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Rejected
        };
        self.updated_at = now;
        Ok(())
    }

    /// Student side of the offline reconciliation: marks the payment as
    /// sent and moves `payment_status` to `pending_confirmation`. Returns
    /// the synthetic order id recorded for traceability.
    pub fn confirm_payment_sent(
        &mut self,
        method: &str,
        transaction_ref: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if self.payment_status == PaymentStatus::Completed {
            return Err(AppError::conflict("Payment has already been completed"));
        }
        if self.offline_payment.owner_confirmed {
            return Err(AppError::conflict("Owner has already confirmed this payment"));
        }
        if self.offline_payment.student_confirmed {
            return Err(AppError::conflict("Payment already marked as sent"));
        }

        let booking_id = self
            .id
            .map(|id| id.to_hex())
            .ok_or_else(|| AppError::invalid_data("Booking has no id"))?;
        let order_id = format!("offline_{}_{}", booking_id, now.timestamp_millis());

        self.payment_status = PaymentStatus::PendingConfirmation;
        self.offline_payment.student_confirmed = true;
        self.offline_payment.student_confirmed_at = Some(now);
        self.offline_payment.payment_method = Some(method.to_string());
        self.offline_payment.transaction_ref = transaction_ref;
        self.offline_payment.notes = notes;
        self.offline_payment.order_id = Some(order_id.clone());
        self.updated_at = now;

        Ok(order_id)
    }

    /// Owner side of the offline reconciliation: acknowledges receipt,
    /// completes the payment and confirms the booking, synthesizing the
    /// final transaction record.
    pub fn confirm_payment_received(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.payment_status == PaymentStatus::Completed {
            return Err(AppError::conflict("Payment has already been completed"));
        }

        let booking_id = self
            .id
            .map(|id| id.to_hex())
            .ok_or_else(|| AppError::invalid_data("Booking has no id"))?;
        let order_id = self
            .offline_payment
            .order_id
            .clone()
            .unwrap_or_else(|| format!("offline_{}_{}", booking_id, now.timestamp_millis()));
        let method = self
            .offline_payment
            .payment_method
            .clone()
            .unwrap_or_else(|| "cash".to_string());

        self.payment_status = PaymentStatus::Completed;
        self.status = BookingStatus::Confirmed;
        self.offline_payment.owner_confirmed = true;
        self.offline_payment.owner_confirmed_at = Some(now);
        self.transaction = Some(BookingTransaction {
            order_id,
            amount: self.total_amount,
            method,
            paid_at: now,
        });
        self.updated_at = now;

        Ok(())
    }

    /// Online capture landing on a booking. Guarded the same way as the
    /// offline path: completion happens exactly once.
    pub fn mark_paid_online(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.payment_status == PaymentStatus::Completed {
            return Err(AppError::conflict("Payment has already been completed"));
        }

        self.payment_status = PaymentStatus::Completed;
        self.status = BookingStatus::Confirmed;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingDecisionRequest {
    pub action: String, // "accept" | "reject"
}

#[derive(Debug, Deserialize)]
pub struct ConfirmOfflinePaymentRequest {
    pub booking_id: String,
    pub payment_method: String, // "cash", "upi", "bank_transfer"
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerConfirmPaymentRequest {
    pub booking_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub student: String,
    pub owner: String,
    pub room: String,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub offline_payment: OfflinePaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<BookingTransaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id.map(|id| id.to_hex()).unwrap_or_default(),
            student: booking.student.to_hex(),
            owner: booking.owner.to_hex(),
            room: booking.room.to_hex(),
            total_amount: booking.total_amount,
            status: booking.status,
            payment_status: booking.payment_status,
            offline_payment: booking.offline_payment,
            transaction: booking.transaction,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking::new(ObjectId::new(), ObjectId::new(), ObjectId::new(), 15000.0)
    }

    #[test]
    fn offline_flow_completes_booking() {
        let mut b = booking();
        let now = Utc::now();

        let order_id = b
            .confirm_payment_sent("upi", Some("UPI-REF-1".to_string()), None, now)
            .unwrap();
        assert_eq!(b.payment_status, PaymentStatus::PendingConfirmation);
        assert!(b.offline_payment.student_confirmed);
        assert!(order_id.starts_with(&format!("offline_{}_", b.id.unwrap().to_hex())));

        b.confirm_payment_received(now).unwrap();
        assert_eq!(b.payment_status, PaymentStatus::Completed);
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.offline_payment.owner_confirmed);

        let tx = b.transaction.as_ref().unwrap();
        assert_eq!(tx.order_id, order_id);
        assert_eq!(tx.amount, 15000.0);
        assert_eq!(tx.method, "upi");
    }

    #[test]
    fn student_cannot_confirm_twice() {
        let mut b = booking();
        let now = Utc::now();

        b.confirm_payment_sent("cash", None, None, now).unwrap();
        let err = b.confirm_payment_sent("cash", None, None, now);
        assert!(err.is_err());
        assert_eq!(b.payment_status, PaymentStatus::PendingConfirmation);
    }

    #[test]
    fn owner_cannot_confirm_twice() {
        let mut b = booking();
        let now = Utc::now();

        b.confirm_payment_sent("upi", None, None, now).unwrap();
        b.confirm_payment_received(now).unwrap();

        assert!(b.confirm_payment_received(now).is_err());
        assert_eq!(b.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn student_cannot_confirm_after_owner() {
        let mut b = booking();
        let now = Utc::now();

        // Owner acknowledging a cash handover without the student's step
        b.confirm_payment_received(now).unwrap();
        assert!(b.confirm_payment_sent("cash", None, None, now).is_err());
    }

    #[test]
    fn decision_only_from_pending() {
        let mut b = booking();
        let now = Utc::now();

        b.decide(true, now).unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.decide(false, now).is_err());
    }

    #[test]
    fn online_capture_completes_once() {
        let mut b = booking();
        let now = Utc::now();

        b.mark_paid_online(now).unwrap();
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.mark_paid_online(now).is_err());
    }
}
