pub mod client;
pub mod error;
pub mod types;

pub use client::AnthropicClient;
pub use error::AnthropicError;
pub use types::{MessagesRequest, MessagesResponse};

/// Anything that can answer a [`MessagesRequest`]. Implemented by the HTTP
/// client and by test doubles.
pub trait MessageSender {
    async fn send_message(&self, req: &MessagesRequest)
    -> Result<MessagesResponse, AnthropicError>;
}

impl MessageSender for AnthropicClient {
    async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        AnthropicClient::send_message(self, req).await
    }
}
