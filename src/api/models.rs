//! Wire shapes of the marketplace REST API. Optional and defaulted fields are
//! lenient on purpose: several endpoints omit fields depending on state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIn {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub condition: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub seller_id: i64,
    pub category_id: i64,
    pub is_wanted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub seller_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub is_wanted: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub approve_status: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    pub category_name: String,
}

/// Filters for the wanted-items board. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WantedQuery {
    pub search: Option<String>,
    pub category: Option<i64>,
    pub location: Option<String>,
    pub max_price: Option<f64>,
}

impl WantedQuery {
    /// `key=value` pairs, percent-encoded, joined with `&`. Empty when no filter is set.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(s) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(format!("search={}", urlencoding::encode(s)));
        }
        if let Some(c) = self.category {
            parts.push(format!("category={}", c));
        }
        if let Some(l) = self.location.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            parts.push(format!("location={}", urlencoding::encode(l)));
        }
        if let Some(p) = self.max_price {
            parts.push(format!("max_price={}", p));
        }
        parts.join("&")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub report_id: i64,
    pub status: String,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub reported_by_id: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeratorStats {
    pub total_users: u64,
    pub total_listings: u64,
    pub pending_listings: u64,
    pub active_reports: u64,
    pub pending_agents: u64,
}

/// Delivery agent awaiting moderator approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAgent {
    pub agent_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub transport_mode: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Value>,
    #[serde(default)]
    pub deliveries_completed: u64,
    #[serde(default)]
    pub identity_img_url: Option<String>,
    #[serde(default)]
    pub day_of_week: Vec<String>,
    #[serde(default)]
    pub time_slot: Vec<Vec<i64>>,
    #[serde(default)]
    pub joined_date: Option<String>,
    #[serde(default)]
    pub approval_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAgentStats {
    pub pending_requests: u64,
    pub accepted_deliveries: u64,
    pub completed_deliveries: u64,
    pub total_earnings: f64,
}

/// Product summary embedded in a delivery request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProduct {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub request_id: i64,
    pub delivery_fee: f64,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub product: Option<DeliveryProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub delivery_time: Option<String>,
}

/// Statuses a delivery agent may set. `Delivered` is terminal on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    OutForDelivery,
    OnTheWay,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::OnTheWay => "on_the_way",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "out_for_delivery" => Ok(DeliveryStatus::OutForDelivery),
            "on_the_way" => Ok(DeliveryStatus::OnTheWay),
            "delivered" => Ok(DeliveryStatus::Delivered),
            other => Err(format!("unknown delivery status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorSetup {
    pub provisioning_uri: String,
}

/// Successful 2FA verification: tokens plus the full user profile in one body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VerifiedLogin {
    pub token: String,
    pub refresh_token: String,
    #[serde(flatten)]
    pub user: UserProfile,
}
