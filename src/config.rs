// config.rs
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub jwt_secret: String,
    pub database_url: String,
    pub environment: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        AppConfig {
            // Missing gateway credentials disable online payments rather
            // than aborting startup
            razorpay_key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            razorpay_webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default(),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            environment,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a number"),
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }

    pub fn razorpay_base_url(&self) -> &'static str {
        "https://api.razorpay.com/v1"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.environment,
            "is_production": self.is_production(),
            "razorpay_key_set": !self.razorpay_key_id.is_empty(),
            "webhook_secret_set": !self.razorpay_webhook_secret.is_empty(),
            "port": self.port,
            "host": self.host,
        })
    }
}
