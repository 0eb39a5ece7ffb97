pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod sanitize;
pub mod deadline;
pub mod fallback;
pub mod handler;
pub mod server;
use serde::{Deserialize, Serialize};

/*

tutor_proxy: one HTTP endpoint in front of a hosted LLM that answers
short math questions (derivatives, integrals) for exam students.

tutor_proxy/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Shared structures and re-exports
│   ├── main.rs         # Binary: env config, logging, serve
│   ├── error.rs        # Error taxonomy, status + client message
│   ├── config.rs       # Environment-driven configuration
│   ├── request.rs      # Inbound request, envelope, upstream reply
│   ├── sanitize.rs     # Prompt cleaning and validation
│   ├── deadline.rs     # Race a future against the internal deadline
│   ├── fallback.rs     # Static answers when the upstream is too slow
│   ├── handler.rs      # Per-request pipeline
│   ├── server.rs       # axum router, CORS, serve loop
│   └── providers/      # Upstream LLM clients
│       ├── mod.rs
│       ├── deepseek.rs
│       └── gemini.rs
└── tests/              # Router-level tests against a fake upstream

*/

pub use error::Error;
pub use config::{FallbackTrigger, ProviderConfig, TutorConfig};
pub use handler::{Outcome, TutorService};
pub use request::{Envelope, UpstreamReply};
pub use server::create_router;

/// TUTOR STRUCTURES:

/// Upstream LLM providers the tutor can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{
  /// DeepSeek chat completions (OpenAI-style schema)
  DeepSeek
  ,
  /// Google Gemini generateContent
  Gemini
}

impl Provider
{   /// Parse a provider from its configuration name
    pub fn from_name(name: &str) -> Option<Self>
    {   match name.trim().to_ascii_lowercase().as_str()
        {   "deepseek" => Some(Provider::DeepSeek)
          , "gemini" | "google" => Some(Provider::Gemini)
          , _ => None
        }
    }

    /// Environment variable holding this provider's API key
    pub fn key_var(&self) -> &'static str
    {   match self
        {   Provider::DeepSeek => "DEEPSEEK_API_KEY"
          , Provider::Gemini => "GEMINI_API_KEY"
        }
    }
}

/// Immutable per-call parameters sent with every upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParams
{   /// Upstream model id (e.g., "deepseek-chat")
    pub model: String
  , /// Human-readable tag reported in the envelope's `modelo`
    pub model_tag: String
  , /// Sampling temperature
    pub temperature: f32
  , /// Maximum tokens the model may generate
    pub max_tokens: u32
  , /// Nucleus sampling, only sent by providers that accept it
    pub top_p: Option<f32>
  , /// Top-k sampling, only sent by providers that accept it
    pub top_k: Option<u32>
  , /// Formatting instructions prepended to every prompt
    pub system_preamble: String
}
