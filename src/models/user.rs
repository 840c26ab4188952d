use serde::{Deserialize, Serialize};

/// Geographic point reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Backend user profile. Held in memory for the session duration only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub username: String,
    #[serde(rename = "lastLocation")]
    pub last_location: Option<LastLocation>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(rename = "lastLocation", skip_serializing_if = "Option::is_none")]
    pub last_location: Option<LastLocation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}
