use std::sync::Arc;
use mongodb::Database;

use crate::config::AppConfig;
use crate::services::razorpay_service::RazorpayService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub razorpay_service: Option<Arc<RazorpayService>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            config,
            razorpay_service: None,
        }
    }

    pub fn with_razorpay(mut self, razorpay_service: Arc<RazorpayService>) -> Self {
        self.razorpay_service = Some(razorpay_service);
        self
    }
}
