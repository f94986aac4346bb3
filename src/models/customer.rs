use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

// Local mirror of a gateway customer, created lazily on first order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user: ObjectId,
    pub gateway_customer_id: String,
    pub name: String,
    pub email: String,
    pub contact: String,

    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        user: ObjectId,
        gateway_customer_id: String,
        name: String,
        email: String,
        contact: String,
    ) -> Self {
        Customer {
            id: Some(ObjectId::new()),
            user,
            gateway_customer_id,
            name,
            email,
            contact,
            created_at: Utc::now(),
        }
    }
}
