//! AI-drafted text for action records.
//!
//! [`SuggestionService`] asks the text provider for either an action-plan
//! draft or a management-facing incident summary. Suggestions are advisory:
//! they never touch record state, and every failure is reported as a
//! [`SuggestionError`] whose [`fallback_message`](SuggestionError::fallback_message)
//! is safe to show in place of the draft.

use thiserror::Error;
use tracing::{debug, warn};

use crate::anthropic::{AnthropicClient, AnthropicError, MessageSender, MessagesRequest};

pub const DISABLED_MESSAGE: &str =
    "AI suggestions are disabled: no API key is configured.";
pub const FALLBACK_MESSAGE: &str =
    "Could not generate a suggestion right now. Please write it manually or try again later.";

const SYSTEM_PROMPT: &str = "You are a quality management assistant helping a team \
     track corrective and preventive actions (CAPA). Answer in plain text, without markdown headings.";

/// Why a suggestion could not be produced.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("suggestions disabled: no API key configured")]
    Disabled,

    #[error("nothing to suggest from: input text is empty")]
    EmptyInput,

    #[error("provider request failed: {0}")]
    Provider(#[from] AnthropicError),

    #[error("provider returned no text")]
    EmptyResponse,
}

impl SuggestionError {
    /// Fixed user-facing text to show instead of a suggestion.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            SuggestionError::Disabled => DISABLED_MESSAGE,
            _ => FALLBACK_MESSAGE,
        }
    }
}

/// Model and sampling parameters for every suggestion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

/// Builds suggestion requests and sends each one exactly once.
pub struct SuggestionService<C> {
    client: Option<C>,
    params: SamplingParams,
}

impl SuggestionService<AnthropicClient> {
    /// A missing or blank key yields a disabled service rather than an error.
    pub fn from_api_key(
        api_key: Option<&str>,
        params: SamplingParams,
    ) -> Result<Self, AnthropicError> {
        let client = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Some(AnthropicClient::new(key.to_string())?),
            None => None,
        };
        Ok(Self::new(client, params))
    }
}

impl<C: MessageSender> SuggestionService<C> {
    pub fn new(client: Option<C>, params: SamplingParams) -> Self {
        Self { client, params }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Drafts an action plan addressing `problem`.
    pub async fn plan_suggestion(&self, problem: &str) -> Result<String, SuggestionError> {
        self.generate(problem, plan_prompt).await
    }

    /// Summarizes an incident description for management.
    pub async fn incident_summary(&self, description: &str) -> Result<String, SuggestionError> {
        self.generate(description, summary_prompt).await
    }

    async fn generate(
        &self,
        input: &str,
        prompt: fn(&str) -> String,
    ) -> Result<String, SuggestionError> {
        let Some(client) = &self.client else {
            debug!("suggestion requested while disabled");
            return Err(SuggestionError::Disabled);
        };
        let input = input.trim();
        if input.is_empty() {
            return Err(SuggestionError::EmptyInput);
        }

        let req = self.request(prompt(input));
        let response = client.send_message(&req).await.map_err(|e| {
            warn!(error = %e, "suggestion request failed, returning fallback");
            SuggestionError::Provider(e)
        })?;

        let text = response.text().trim().to_string();
        if text.is_empty() {
            warn!(id = %response.id, "provider returned an empty suggestion");
            return Err(SuggestionError::EmptyResponse);
        }
        Ok(text)
    }

    fn request(&self, content: String) -> MessagesRequest {
        let mut req =
            MessagesRequest::single_turn(self.params.model.clone(), self.params.max_tokens, content);
        req.system = Some(SYSTEM_PROMPT.to_string());
        req.temperature = Some(self.params.temperature);
        req.top_p = Some(self.params.top_p);
        req.top_k = Some(self.params.top_k);
        req
    }
}

fn plan_prompt(problem: &str) -> String {
    format!(
        "Propose a concise action plan for the following problem found during a \
         quality or safety review. List 3 to 5 concrete, verifiable steps, each on its \
         own line starting with a number. Include who should typically own each step \
         and how its effectiveness can be verified.\n\
         \n\
         Problem: {problem}"
    )
}

fn summary_prompt(description: &str) -> String {
    format!(
        "Write a short executive summary (at most 4 sentences) of the following \
         incident for management. State what happened, the likely impact, and the \
         immediate containment needed. Do not invent facts that are not in the text.\n\
         \n\
         Incident: {description}"
    )
}
