pub(crate) mod access;
pub(crate) mod razorpay_service;
