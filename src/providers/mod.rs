//! LLM provider implementations

pub mod deepseek;
pub mod gemini;

use log::{debug, error};

pub use deepseek::DeepSeekClient;
pub use gemini::GeminiClient;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::request::UpstreamReply;
use crate::Provider;

/// Formatting instructions shared by every provider
pub const TUTOR_PREAMBLE: &str = "You are a math tutor for final-year \
high-school students preparing for the university entrance exam. \
Answer in the same language as the student.

FORMAT RULES:
1. Keep answers short and direct; keep explanations to the essentials.
2. Write formulas in LaTeX ($ for inline, $$ for display).
3. After each LaTeX formula, give its plain-language reading in parentheses.
4. For derivatives and integrals, show the key solving steps concisely.
5. Structure: Problem -> Numbered steps -> Final result.
6. Use accessible, encouraging language.
7. Include a check when it is relevant.

STEP FORMAT:
- Step 1: [Identify the type of function]
- Step 2: [Apply the matching rule]
- Step 3: [Simplify the result]
- Final result: [Simplified answer]

Example: \"For $f(x)=x^2$, its derivative is $f'(x)=2x$ (two x)\"

IMPORTANT: if the function is not valid or cannot be solved, say so clearly.";

/// The configured upstream, one variant per provider
#[derive(Debug, Clone)]
pub enum Upstream
{   DeepSeek(DeepSeekClient)
  , Gemini(GeminiClient)
}

impl Upstream
{   /// Build the client for the configured provider
    pub fn new(config: &ProviderConfig, api_key: String) -> Self
    {   debug!("Creating upstream client for {:?}", config.provider);
        match config.provider
        {   Provider::DeepSeek => Upstream::DeepSeek(
              DeepSeekClient::new(api_key, config.api_base.clone())
            )
          , Provider::Gemini => Upstream::Gemini(
              GeminiClient::new(api_key, config.api_base.clone())
            )
        }
    }

    /// Send one prompt, no retries
    pub async fn send_prompt(&self, prompt: &str)
      -> Result<UpstreamReply, Error>
    {   match self
        {   Upstream::DeepSeek(client) => client.send_prompt(prompt).await
          , Upstream::Gemini(client) => client.send_prompt(prompt).await
        }
    }

    /// Tag reported in the envelope for real model answers
    pub fn model_tag(&self) -> &str
    {   match self
        {   Upstream::DeepSeek(client) => &client.params().model_tag
          , Upstream::Gemini(client) => &client.params().model_tag
        }
    }
}

/// Map a non-2xx upstream status to the client-facing taxonomy
pub fn map_status(status: u16) -> Error
{   match status
    {   429 => Error::RateLimitExceeded
      , 401 | 403 => Error::UpstreamAuth(status)
      , other => Error::ApiError(other)
    }
}

/// Pass a successful response through; log and map anything else.
/// The upstream error body stays in the server log.
pub(crate) async fn ensure_success(
  response: reqwest::Response
, provider: &str
) -> Result<reqwest::Response, Error>
{   let status = response.status();
    if status.is_success()
    {   return Ok(response);
    }

    let error_text = response.text().await
      .unwrap_or_else(|_| "Unknown error".to_string());
    error!("{} API error: {} {}", provider, status, error_text);
    Err(map_status(status.as_u16()))
}

/// Transport failure, logged without the request URL (it may carry a key)
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> Error
{   let err = err.without_url();
    error!("{} HTTP error: {}", provider, err);
    Error::HttpError(err.to_string())
}
