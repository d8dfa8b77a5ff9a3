use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCoupon {
    pub message: &'static str,
    pub code: String,
    pub discount_percentage: i32,
}
