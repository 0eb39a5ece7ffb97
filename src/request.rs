//! Inbound request, response envelope and upstream reply types

use serde::{Deserialize, Serialize};

/// Inbound tutoring request. `prompt` stays a raw JSON value so a
/// non-string prompt can be told apart from a missing one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest
{   /// The prompt as sent by the client
    #[serde(default)]
    pub prompt: Option<serde_json::Value>
}

/// What a provider returns on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply
{   /// Generated text, trimmed
    pub text: String
  , /// Total tokens reported by the provider, if any
    pub tokens: Option<u64>
  , /// Tag of the model that produced it
    pub model_tag: String
}

/// Uniform response envelope, the same shape for every outcome.
/// Field names are part of the public contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope
{   /// Discriminant: true for answers, false for errors
    pub success: bool
  , /// Answer text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultado: Option<String>
  , /// Client-facing error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>
  , /// Token usage, reported or estimated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>
  , /// Source of the answer (model, fallback or test mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modelo: Option<String>
}

impl Envelope
{   /// Successful answer from any source
    pub fn answer(
      text: impl Into<String>
    , tokens: u64
    , modelo: impl Into<String>
    ) -> Self
    {   Envelope
        {   success: true
          , resultado: Some(text.into())
          , error: None
          , tokens: Some(tokens)
          , modelo: Some(modelo.into())
        }
    }

    /// Successful answer relayed from the upstream model
    pub fn from_reply(reply: UpstreamReply) -> Self
    {   let tokens = reply.tokens
          .unwrap_or_else(|| estimate_tokens(&reply.text));
        Envelope::answer(reply.text, tokens, reply.model_tag)
    }

    /// Error envelope
    pub fn failure(message: impl Into<String>) -> Self
    {   Envelope
        {   success: false
          , resultado: None
          , error: Some(message.into())
          , tokens: None
          , modelo: None
        }
    }
}

/// Rough token count when the provider does not report one:
/// one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64
{   (text.chars().count() as u64).div_ceil(4)
}
