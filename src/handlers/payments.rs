// handlers/payments.rs
//
// Payment reconciliation: the Razorpay-backed online path (order ->
// signature verify -> webhook events) and the offline path where the
// student marks the payment sent and the owner marks it received.
use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId},
    Collection,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::booking::{
    Booking, BookingResponse, ConfirmOfflinePaymentRequest, OwnerConfirmPaymentRequest,
    PaymentStatus,
};
use crate::models::customer::Customer;
use crate::models::room::Room;
use crate::models::transaction::{PaymentTransaction, TransactionResponse, TransactionStatus};
use crate::models::user::{Claims, User};
use crate::services::access::{self, Action};
use crate::services::razorpay_service::RazorpayService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: f64,
    pub currency: Option<String>,
    pub booking_id: Option<String>,
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

fn razorpay(state: &AppState) -> Result<&RazorpayService> {
    state
        .razorpay_service
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Razorpay service is not available".to_string()))
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Value>> {
    let user_id = access::require(&claims, Action::StartOnlinePayment)?;
    let service = razorpay(&state)?;

    if payload.amount <= 0.0 {
        return Err(AppError::invalid_data("Amount must be greater than 0"));
    }

    let booking_id = payload
        .booking_id
        .as_deref()
        .map(ObjectId::parse_str)
        .transpose()?;
    let room_id = payload
        .room_id
        .as_deref()
        .map(ObjectId::parse_str)
        .transpose()?;

    let currency = payload.currency.unwrap_or_else(|| "INR".to_string());
    // Gateway wants minor units (paise)
    let amount_minor = (payload.amount * 100.0).round() as i64;
    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());

    ensure_customer(&state, service, user_id).await;

    let order = service
        .create_order(amount_minor, &currency, &receipt)
        .await
        .map_err(|e| AppError::razorpay(e.to_string()))?;

    let tx = PaymentTransaction::new(
        user_id,
        booking_id,
        room_id,
        order.id.clone(),
        order.amount,
        order.currency.clone(),
        receipt,
    );

    let transactions: Collection<PaymentTransaction> = state.db.collection("transactions");
    transactions
        .insert_one(&tx)
        .await
        .map_err(AppError::from_write_error)?;

    info!("✅ Order {} created for user {}", order.id, user_id.to_hex());

    Ok(Json(json!({
        "success": true,
        "data": {
            "order_id": order.id,
            "amount": order.amount,
            "currency": order.currency,
            "transaction_id": tx.id.map(|id| id.to_hex()).unwrap_or_default(),
            "key_id": service.key_id(),
        }
    })))
}

// Customer records mirror the gateway customer and are created lazily on
// the first order. Failure here never blocks the order itself.
async fn ensure_customer(state: &AppState, service: &RazorpayService, user_id: ObjectId) {
    let customers: Collection<Customer> = state.db.collection("customers");

    match customers.find_one(doc! { "user": user_id }).await {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => {
            warn!("Customer lookup failed for {}: {}", user_id.to_hex(), e);
            return;
        }
    }

    let users: Collection<User> = state.db.collection("users");
    let user = match users.find_one(doc! { "_id": user_id }).await {
        Ok(Some(user)) => user,
        _ => {
            warn!("No user record for {}, skipping customer creation", user_id.to_hex());
            return;
        }
    };

    match service
        .create_customer(&user.name, &user.email, &user.phone)
        .await
    {
        Ok(gateway_customer) => {
            let customer = Customer::new(
                user_id,
                gateway_customer.id,
                user.name,
                user.email,
                user.phone,
            );
            // A concurrent order may have won the unique-index race; that
            // is fine, the record exists either way.
            if let Err(e) = customers.insert_one(&customer).await {
                warn!("Customer insert failed for {}: {}", user_id.to_hex(), e);
            }
        }
        Err(e) => {
            warn!("Gateway customer creation failed for {}: {}", user_id.to_hex(), e);
        }
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>> {
    access::require(&claims, Action::StartOnlinePayment)?;
    let service = razorpay(&state)?;

    let transactions: Collection<PaymentTransaction> = state.db.collection("transactions");
    let mut tx = transactions
        .find_one(doc! { "order_id": &payload.order_id })
        .await?
        .ok_or(AppError::TransactionNotFound)?;

    let now = Utc::now();

    if !service.verify_payment_signature(&payload.order_id, &payload.payment_id, &payload.signature) {
        if tx.apply_failed(Some("SIGNATURE_VERIFICATION_FAILED".to_string()), now) {
            transactions
                .update_one(
                    doc! {
                        "order_id": &payload.order_id,
                        "status": { "$nin": ["captured", "refunded", "failed"] },
                    },
                    doc! { "$set": {
                        "status": TransactionStatus::Failed.as_str(),
                        "error_code": "SIGNATURE_VERIFICATION_FAILED",
                        "updated_at": now.to_rfc3339(),
                    }},
                )
                .await?;
        }
        warn!("❌ Signature mismatch for order {}", payload.order_id);
        return Err(AppError::SignatureMismatch);
    }

    // Guarded write: repeat verifies land in the same captured state
    if tx.apply_captured(&payload.payment_id, now) {
        transactions
            .update_one(
                doc! {
                    "order_id": &payload.order_id,
                    "status": { "$ne": "captured" },
                },
                doc! { "$set": {
                    "status": TransactionStatus::Captured.as_str(),
                    "payment_id": &payload.payment_id,
                    "signature": &payload.signature,
                    "error_code": null,
                    "completed_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }},
            )
            .await?;

        if let Some(booking_id) = tx.booking {
            settle_booking_online(&state, booking_id, now).await;
        }
    }

    info!("✅ Payment captured for order {}", payload.order_id);

    Ok(Json(json!({
        "success": true,
        "data": { "order_id": payload.order_id, "status": "captured" }
    })))
}

// Marks the linked booking paid after a capture. Best effort: a booking
// that is already completed (or gone) is left alone.
async fn settle_booking_online(state: &AppState, booking_id: ObjectId, now: chrono::DateTime<Utc>) {
    let bookings: Collection<Booking> = state.db.collection("bookings");

    let booking = match bookings.find_one(doc! { "_id": booking_id }).await {
        Ok(Some(booking)) => booking,
        Ok(None) => {
            warn!("Captured order references missing booking {}", booking_id.to_hex());
            return;
        }
        Err(e) => {
            error!("Booking lookup failed after capture: {}", e);
            return;
        }
    };

    if booking.payment_status == PaymentStatus::Completed {
        return;
    }

    let result = bookings
        .update_one(
            doc! { "_id": booking_id, "payment_status": { "$ne": "completed" } },
            doc! { "$set": {
                "payment_status": "completed",
                "status": "confirmed",
                "updated_at": now.to_rfc3339(),
            }},
        )
        .await;

    if let Err(e) = result {
        error!("Failed to settle booking {} after capture: {}", booking_id.to_hex(), e);
    }
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let service = razorpay(&state)?;

    let signature = headers
        .get("x-razorpay-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::SignatureMismatch)?;

    // Reject before touching any state
    if !service.verify_webhook_signature(body.as_bytes(), signature) {
        warn!("❌ Webhook signature verification failed");
        return Err(AppError::SignatureMismatch);
    }

    let event: Value = serde_json::from_str(&body)?;
    let event_type = event["event"].as_str().unwrap_or_default().to_string();

    info!("📬 Webhook received: {}", event_type);

    match event_type.as_str() {
        "payment.authorized" | "payment.captured" | "payment.failed" => {
            handle_payment_event(&state, &event_type, &event).await?;
        }
        "refund.created" | "refund.processed" => {
            handle_refund_event(&state, &event_type, &event).await?;
        }
        other => {
            info!("Ignoring unhandled webhook event type: {}", other);
        }
    }

    Ok(Json(json!({ "received": true })))
}

async fn handle_payment_event(state: &AppState, event_type: &str, event: &Value) -> Result<()> {
    let entity = &event["payload"]["payment"]["entity"];
    let payment_id = entity["id"].as_str().unwrap_or_default().to_string();
    let order_id = entity["order_id"].as_str().unwrap_or_default().to_string();

    if order_id.is_empty() && payment_id.is_empty() {
        warn!("Payment webhook without order or payment id, ignoring");
        return Ok(());
    }

    let transactions: Collection<PaymentTransaction> = state.db.collection("transactions");
    let filter = if order_id.is_empty() {
        doc! { "payment_id": &payment_id }
    } else {
        doc! { "order_id": &order_id }
    };

    let mut tx = match transactions.find_one(filter).await? {
        Some(tx) => tx,
        None => {
            warn!("No transaction for webhook order '{}' / payment '{}'", order_id, payment_id);
            return Ok(());
        }
    };

    let now = Utc::now();

    match event_type {
        "payment.authorized" => {
            if tx.apply_authorized(&payment_id, now) {
                transactions
                    .update_one(
                        doc! { "order_id": &tx.order_id, "status": "created" },
                        doc! { "$set": {
                            "status": TransactionStatus::Authorized.as_str(),
                            "payment_id": &payment_id,
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;
            }
        }
        "payment.captured" => {
            if tx.apply_captured(&payment_id, now) {
                transactions
                    .update_one(
                        doc! { "order_id": &tx.order_id, "status": { "$ne": "captured" } },
                        doc! { "$set": {
                            "status": TransactionStatus::Captured.as_str(),
                            "payment_id": &payment_id,
                            "error_code": null,
                            "completed_at": now.to_rfc3339(),
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;

                if let Some(booking_id) = tx.booking {
                    settle_booking_online(state, booking_id, now).await;
                }
            }
        }
        "payment.failed" => {
            let error_code = entity["error_code"].as_str().map(|s| s.to_string());
            if tx.apply_failed(error_code.clone(), now) {
                transactions
                    .update_one(
                        doc! {
                            "order_id": &tx.order_id,
                            "status": { "$nin": ["captured", "refunded", "failed"] },
                        },
                        doc! { "$set": {
                            "status": TransactionStatus::Failed.as_str(),
                            "error_code": error_code.unwrap_or_default(),
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;
            }
        }
        _ => unreachable!("dispatched above"),
    }

    Ok(())
}

async fn handle_refund_event(state: &AppState, event_type: &str, event: &Value) -> Result<()> {
    let entity = &event["payload"]["refund"]["entity"];
    let refund_id = entity["id"].as_str().unwrap_or_default().to_string();
    let payment_id = entity["payment_id"].as_str().unwrap_or_default().to_string();
    let refund_amount = entity["amount"].as_i64();

    if refund_id.is_empty() || payment_id.is_empty() {
        warn!("Refund webhook without refund or payment id, ignoring");
        return Ok(());
    }

    let transactions: Collection<PaymentTransaction> = state.db.collection("transactions");
    let mut tx = match transactions
        .find_one(doc! { "payment_id": &payment_id })
        .await?
    {
        Some(tx) => tx,
        None => {
            warn!("No transaction for refund webhook payment '{}'", payment_id);
            return Ok(());
        }
    };

    let now = Utc::now();

    match event_type {
        "refund.created" => {
            if tx.apply_refund_created(&refund_id, refund_amount, now) {
                transactions
                    .update_one(
                        doc! { "payment_id": &payment_id },
                        doc! { "$set": {
                            "refund_id": &refund_id,
                            "refund_amount": refund_amount,
                            "refund_status": "created",
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;
            }
        }
        "refund.processed" => {
            if tx.apply_refund_processed(&refund_id, now) {
                transactions
                    .update_one(
                        doc! { "payment_id": &payment_id, "status": { "$ne": "refunded" } },
                        doc! { "$set": {
                            "status": TransactionStatus::Refunded.as_str(),
                            "refund_id": &refund_id,
                            "refund_status": "processed",
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;
            }
        }
        _ => unreachable!("dispatched above"),
    }

    Ok(())
}

pub async fn confirm_offline_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ConfirmOfflinePaymentRequest>,
) -> Result<Json<Value>> {
    let student = access::require(&claims, Action::ConfirmPaymentSent)?;
    let booking_id = ObjectId::parse_str(&payload.booking_id)?;

    if payload.payment_method.trim().is_empty() {
        return Err(AppError::invalid_data("payment_method is required"));
    }

    let bookings: Collection<Booking> = state.db.collection("bookings");
    let mut booking = bookings
        .find_one(doc! { "_id": booking_id })
        .await?
        .ok_or(AppError::BookingNotFound)?;

    if booking.student != student {
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now();
    let order_id = booking.confirm_payment_sent(
        &payload.payment_method,
        payload.transaction_id.clone(),
        payload.notes.clone(),
        now,
    )?;

    // Source-state precondition re-asserted in the filter so a concurrent
    // confirm cannot double-apply
    let updated = bookings
        .update_one(
            doc! {
                "_id": booking_id,
                "payment_status": { "$ne": "completed" },
                "offline_payment.student_confirmed": { "$ne": true },
                "offline_payment.owner_confirmed": { "$ne": true },
            },
            doc! { "$set": {
                "payment_status": PaymentStatus::PendingConfirmation.as_str(),
                "offline_payment.student_confirmed": true,
                "offline_payment.student_confirmed_at": now.to_rfc3339(),
                "offline_payment.payment_method": &payload.payment_method,
                "offline_payment.transaction_ref": payload.transaction_id.as_deref(),
                "offline_payment.notes": payload.notes.as_deref(),
                "offline_payment.order_id": &order_id,
                "updated_at": now.to_rfc3339(),
            }},
        )
        .await?;

    if updated.modified_count == 0 {
        return Err(AppError::conflict("Payment has already been confirmed"));
    }

    info!("✅ Student confirmed offline payment for booking {}", booking_id.to_hex());

    Ok(Json(json!({
        "success": true,
        "data": {
            "booking_id": payload.booking_id,
            "payment_status": PaymentStatus::PendingConfirmation.as_str(),
            "order_id": order_id,
        }
    })))
}

pub async fn owner_confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OwnerConfirmPaymentRequest>,
) -> Result<Json<Value>> {
    let owner = access::require(&claims, Action::ConfirmPaymentReceived)?;
    let booking_id = ObjectId::parse_str(&payload.booking_id)?;

    let bookings: Collection<Booking> = state.db.collection("bookings");
    let mut booking = bookings
        .find_one(doc! { "_id": booking_id })
        .await?
        .ok_or(AppError::BookingNotFound)?;

    if booking.owner != owner {
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now();
    booking.confirm_payment_received(now)?;

    let transaction = bson::to_bson(&booking.transaction)
        .map_err(|e| AppError::service(format!("Transaction encoding failed: {}", e)))?;

    let updated = bookings
        .update_one(
            doc! { "_id": booking_id, "payment_status": { "$ne": "completed" } },
            doc! { "$set": {
                "payment_status": PaymentStatus::Completed.as_str(),
                "status": "confirmed",
                "offline_payment.owner_confirmed": true,
                "offline_payment.owner_confirmed_at": now.to_rfc3339(),
                "transaction": transaction,
                "updated_at": now.to_rfc3339(),
            }},
        )
        .await?;

    if updated.modified_count == 0 {
        return Err(AppError::conflict("Payment has already been completed"));
    }

    // Inventory side effect, best effort: the booking stays completed even
    // if the room update fails (no compensating action)
    decrement_room_availability(&state, booking.room).await;

    info!("✅ Owner confirmed payment for booking {}", booking_id.to_hex());

    Ok(Json(json!({ "success": true, "data": BookingResponse::from(booking) })))
}

// Atomic decrement with a floor at 0; the filter loses the race instead of
// the counter going negative. Availability is recomputed from the result.
async fn decrement_room_availability(state: &AppState, room_id: ObjectId) {
    let rooms: Collection<Room> = state.db.collection("rooms");

    let updated = rooms
        .find_one_and_update(
            doc! { "_id": room_id, "available_rooms": { "$gt": 0 } },
            doc! { "$inc": { "available_rooms": -1 } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await;

    match updated {
        Ok(Some(room)) => {
            let is_available = room.available_rooms > 0;
            if let Err(e) = rooms
                .update_one(
                    doc! { "_id": room_id },
                    doc! { "$set": { "is_available": is_available } },
                )
                .await
            {
                error!("Failed to recompute availability for room {}: {}", room_id.to_hex(), e);
            }
        }
        Ok(None) => {
            warn!("Room {} already at zero availability", room_id.to_hex());
        }
        Err(e) => {
            error!("Failed to decrement availability for room {}: {}", room_id.to_hex(), e);
        }
    }
}

// Student's own gateway transactions, newest first
pub async fn my_transactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let user_id = access::require(&claims, Action::StartOnlinePayment)?;

    let transactions: Collection<PaymentTransaction> = state.db.collection("transactions");
    let cursor = transactions.find(doc! { "user": user_id }).await?;
    let mut txs: Vec<PaymentTransaction> = cursor.try_collect().await?;
    txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let responses: Vec<TransactionResponse> =
        txs.into_iter().map(TransactionResponse::from).collect();

    Ok(Json(json!({ "success": true, "data": responses })))
}

// Read-side join for the owner dashboard: bookings awaiting confirmation
// with student and room summaries attached.
pub async fn pending_offline_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let owner = access::require(&claims, Action::ConfirmPaymentReceived)?;

    let bookings: Collection<Booking> = state.db.collection("bookings");
    let cursor = bookings
        .find(doc! { "owner": owner, "payment_status": "pending_confirmation" })
        .await?;
    let pending: Vec<Booking> = cursor.try_collect().await?;

    if pending.is_empty() {
        return Ok(Json(json!({ "success": true, "data": [] })));
    }

    let student_ids: Vec<ObjectId> = pending.iter().map(|b| b.student).collect();
    let room_ids: Vec<ObjectId> = pending.iter().map(|b| b.room).collect();

    let users: Collection<User> = state.db.collection("users");
    let students: Vec<User> = users
        .find(doc! { "_id": { "$in": student_ids } })
        .await?
        .try_collect()
        .await?;

    let rooms: Collection<Room> = state.db.collection("rooms");
    let room_docs: Vec<Room> = rooms
        .find(doc! { "_id": { "$in": room_ids } })
        .await?
        .try_collect()
        .await?;

    let summaries: Vec<Value> = pending
        .into_iter()
        .map(|booking| {
            let student = students.iter().find(|u| u._id == Some(booking.student));
            let room = room_docs.iter().find(|r| r.id == Some(booking.room));
            json!({
                "booking_id": booking.id.map(|id| id.to_hex()).unwrap_or_default(),
                "total_amount": booking.total_amount,
                "payment_method": booking.offline_payment.payment_method,
                "transaction_ref": booking.offline_payment.transaction_ref,
                "notes": booking.offline_payment.notes,
                "student_confirmed_at": booking.offline_payment.student_confirmed_at,
                "student": student.map(|u| json!({
                    "name": u.name,
                    "email": u.email,
                    "phone": u.phone,
                })),
                "room": room.map(|r| json!({
                    "title": r.title,
                    "city": r.city,
                    "rent": r.rent,
                })),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": summaries })))
}
