use std::fmt;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

use crate::error::Error;
use crate::request::UpstreamReply;
use crate::CallParams;

const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

/// Safety categories relaxed so calculus answers are never blocked
const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT"
, "HARM_CATEGORY_HATE_SPEECH"
, "HARM_CATEGORY_SEXUALLY_EXPLICIT"
, "HARM_CATEGORY_DANGEROUS_CONTENT"
];

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f32
  , pub max_output_tokens: u32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting
{   pub category: String
  , pub threshold: String
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
  , pub safety_settings: Vec<SafetySetting>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
  , #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   pub content: Content
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata
{   #[serde(default)]
    pub total_token_count: Option<u64>
}

// ===== Gemini Client =====

/// Gemini generateContent client. The key travels as a query parameter.
#[derive(Clone)]
pub struct GeminiClient
{   api_key: String
  , api_base: String
  , params: CallParams
  , http_client: reqwest::Client
}

impl fmt::Debug for GeminiClient
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("GeminiClient")
          .field("api_base", &self.api_base)
          .field("model", &self.params.model)
          .finish()
    }
}

impl GeminiClient
{   pub fn new(api_key: String, api_base: Option<String>) -> Self
    {   debug!("Creating GeminiClient");
        GeminiClient
        {   api_key
          , api_base: api_base
              .unwrap_or_else(|| GEMINI_API_BASE.to_string())
              .trim_end_matches('/')
              .to_string()
          , params: default_call_params()
          , http_client: reqwest::Client::new()
        }
    }

    pub fn params(&self) -> &CallParams
    {   &self.params
    }

    /// Gemini takes a single text: preamble, blank line, prompt
    pub fn build_request(&self, prompt: &str) -> GeminiRequest
    {   GeminiRequest
        {   contents: vec![
              Content
              {   parts: vec![
                    Part
                    {   text: Some(format!(
                          "{}\n\n{}", self.params.system_preamble, prompt
                        ))
                    }
                  ]
              }
            ]
          , generation_config: GenerationConfig
            {   temperature: self.params.temperature
              , max_output_tokens: self.params.max_tokens
              , top_p: self.params.top_p
              , top_k: self.params.top_k
            }
          , safety_settings: SAFETY_CATEGORIES.iter()
              .map(|category| SafetySetting
              {   category: category.to_string()
                , threshold: "BLOCK_NONE".to_string()
              })
              .collect()
        }
    }

    pub fn parse_reply(&self, response: GeminiResponse)
      -> Result<UpstreamReply, Error>
    {   let candidate = response.candidates.first()
          .ok_or_else(|| {
            error!("No candidates in Gemini response");
            Error::ParseError("no candidates in response".to_string())
          })?;
        trace!("Gemini finish reason: {:?}", candidate.finish_reason);

        let text = candidate.content.parts.first()
          .and_then(|p| p.text.as_deref())
          .map(str::trim)
          .unwrap_or_default();
        if text.is_empty()
        {   error!("Empty content in Gemini response");
            return Err(Error::EmptyResponse);
        }

        Ok(UpstreamReply
        {   text: text.to_string()
          , tokens: response.usage_metadata
              .and_then(|u| u.total_token_count)
          , model_tag: self.params.model_tag.clone()
        })
    }

    pub async fn send_prompt(&self, prompt: &str)
      -> Result<UpstreamReply, Error>
    {   debug!("Sending prompt to Gemini model: {}", self.params.model);
        let request = self.build_request(prompt);

        let response = self.http_client
          .post(format!(
            "{}/models/{}:generateContent",
            self.api_base, self.params.model
          ))
          .query(&[("key", self.api_key.as_str())])
          .json(&request)
          .send()
          .await
          .map_err(|e| super::transport_error("Gemini", e))?;

        trace!("Gemini response status: {}", response.status());
        let response = super::ensure_success(response, "Gemini").await?;

        let gemini_response: GeminiResponse
          = response.json().await.map_err(|e| {
            error!("Gemini parse error: {}", e.without_url());
            Error::ParseError("unexpected response body".to_string())
          })?;

        self.parse_reply(gemini_response)
    }
}

/// Default call parameters for Gemini
pub fn default_call_params() -> CallParams
{   CallParams
    {   model: "gemini-1.5-flash".to_string()
      , model_tag: "Gemini 1.5 Flash".to_string()
      , temperature: 0.3
      , max_tokens: 800
      , top_p: Some(0.8)
      , top_k: Some(40)
      , system_preamble: super::TUTOR_PREAMBLE.to_string()
    }
}
