use serde::{Deserialize, Serialize};

use crate::domain::entities::{Session, User};

// Signin answers with the token and the user fields side by side.
#[derive(Debug, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    #[serde(flatten)]
    pub user: User,
}

impl From<SignInResponse> for Session {
    fn from(response: SignInResponse) -> Self {
        Session {
            token: response.token,
            user: response.user,
        }
    }
}

// Body for cart add and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: i64,
    pub quantity: u32,
}

// Error envelope some backend endpoints send; others reply with plain text.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

// Pulls a human-readable message out of an error body, if there is one.
pub fn error_message(body: &str) -> Option<String> {
    if let Ok(payload) = serde_json::from_str::<ErrorResponse>(body) {
        return Some(payload.message);
    }
    let trimmed = body.trim();
    // A JSON body without a message field carries nothing worth showing.
    if trimmed.is_empty() || trimmed.starts_with('{') {
        return None;
    }
    Some(trimmed.to_string())
}
