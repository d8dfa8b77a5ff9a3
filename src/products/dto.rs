use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: sqlx::types::Decimal,
    #[serde(default)]
    pub category: String,
    /// Raw image bytes; uploaded to the image host before the row is written.
    pub image: Option<serde_bytes::ByteBuf>,
    pub content_type: Option<String>,
}
