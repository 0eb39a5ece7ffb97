use std::fmt;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

use crate::error::Error;
use crate::request::UpstreamReply;
use crate::CallParams;

const DEEPSEEK_API_BASE: &str
  = "https://api.deepseek.com/v1";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct DeepSeekChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
  , pub stream: bool
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeepSeekChatResponse
{   pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<Usage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub total_tokens: Option<u64>
}

// ===== DeepSeek Client =====

/// DeepSeek chat completions client
#[derive(Clone)]
pub struct DeepSeekClient
{   api_key: String
  , api_base: String
  , params: CallParams
  , http_client: reqwest::Client
}

impl fmt::Debug for DeepSeekClient
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("DeepSeekClient")
          .field("api_base", &self.api_base)
          .field("model", &self.params.model)
          .finish()
    }
}

impl DeepSeekClient
{   pub fn new(api_key: String, api_base: Option<String>) -> Self
    {   debug!("Creating DeepSeekClient");
        DeepSeekClient
        {   api_key
          , api_base: api_base
              .unwrap_or_else(|| DEEPSEEK_API_BASE.to_string())
              .trim_end_matches('/')
              .to_string()
          , params: default_call_params()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn params(&self) -> &CallParams
    {   &self.params
    }

    /// Body for one request: system preamble then the student's prompt
    pub fn build_request(&self, prompt: &str) -> DeepSeekChatRequest
    {   DeepSeekChatRequest
        {   model: self.params.model.clone()
          , messages: vec![
              ChatMessage
              {   role: "system".to_string()
                , content: Some(self.params.system_preamble.clone())
              }
            , ChatMessage
              {   role: "user".to_string()
                , content: Some(prompt.to_string())
              }
            ]
          , temperature: self.params.temperature
          , max_tokens: self.params.max_tokens
          , stream: false
        }
    }

    /// Pull the answer text and token usage out of a parsed response
    pub fn parse_reply(&self, response: DeepSeekChatResponse)
      -> Result<UpstreamReply, Error>
    {   let choice = response.choices.first()
          .ok_or_else(|| {
            error!("No choices in DeepSeek response");
            Error::ParseError("no choices in response".to_string())
          })?;
        trace!("DeepSeek finish reason: {:?}", choice.finish_reason);

        let text = choice.message.content.as_deref()
          .map(str::trim)
          .unwrap_or_default();
        if text.is_empty()
        {   error!("Empty content in DeepSeek response");
            return Err(Error::EmptyResponse);
        }

        Ok(UpstreamReply
        {   text: text.to_string()
          , tokens: response.usage.and_then(|u| u.total_tokens)
          , model_tag: self.params.model_tag.clone()
        })
    }

    pub async fn send_prompt(&self, prompt: &str)
      -> Result<UpstreamReply, Error>
    {   debug!("Sending prompt to DeepSeek model: {}", self.params.model);
        let request = self.build_request(prompt);

        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .header("Authorization", format!("Bearer {}", self.api_key))
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| super::transport_error("DeepSeek", e))?;

        trace!("DeepSeek response status: {}", response.status());
        let response = super::ensure_success(response, "DeepSeek").await?;

        let chat_response: DeepSeekChatResponse
          = response.json().await.map_err(|e| {
            error!("DeepSeek parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        self.parse_reply(chat_response)
    }
}

/// Default call parameters for DeepSeek
pub fn default_call_params() -> CallParams
{   CallParams
    {   model: "deepseek-chat".to_string()
      , model_tag: "DeepSeek V3".to_string()
      , temperature: 0.3
      , max_tokens: 800
      , top_p: None
      , top_k: None
      , system_preamble: super::TUTOR_PREAMBLE.to_string()
    }
}
