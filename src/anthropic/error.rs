//! Erros do cliente HTTP do provedor de texto.

use thiserror::Error;

/// Falhas possíveis em uma única chamada ao provedor.
///
/// Nenhuma variante é retentada: quem chama decide o que exibir.
#[derive(Debug, Error)]
pub enum AnthropicError {
    /// HTTP 429. `retry_after_ms` vem do cabeçalho `retry-after` quando presente.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outro status não-2xx (401 chave inválida, 500, ...).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// DNS, conexão recusada, timeout ou corpo ilegível.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
