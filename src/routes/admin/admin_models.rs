use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct AdminDefaultResponse {
    pub success: bool,
    pub message: String,
}
