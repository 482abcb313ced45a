use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddRatingRequest {
    pub rating: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentList {
    pub comments: Vec<String>,
    pub total_comments: usize,
}
