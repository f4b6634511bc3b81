use crate::types::{Message, Prediction};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Engine {
    async fn classify(&self, message: &Message) -> Result<Prediction>;
}
