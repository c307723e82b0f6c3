use serde::{Deserialize, Serialize};

// Job creation request and response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub usernames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub token: Option<String>,
}


// Raw file upload, options travel in the query string
#[derive(Debug, Deserialize)]
pub struct UploadJobQuery {
    pub file_name: Option<String>,
    pub min_delay: Option<u64>,
    pub max_delay: Option<u64>,
}


// Stop, export and error replies
#[derive(Debug, Serialize, Deserialize)]
pub struct JobDefaultResponse {
    pub success: bool,
    pub message: String,
}
