//! Configuration for the upstream provider, deadline and fallback

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::debug;

use crate::error::Error;
use crate::Provider;

/// Which upstream failures are answered from the fallback catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackTrigger
{   /// Only the internal deadline firing
    Timeout
  , /// Any upstream failure (status, transport, malformed body)
    Any
}

impl FallbackTrigger
{   /// Parse from `TUTOR_FALLBACK_ON`
    pub fn from_name(name: &str) -> Option<Self>
    {   match name.trim().to_ascii_lowercase().as_str()
        {   "timeout" => Some(FallbackTrigger::Timeout)
          , "any" => Some(FallbackTrigger::Any)
          , _ => None
        }
    }

    /// Whether an upstream error should be answered from the catalog
    pub fn covers(&self, err: &Error) -> bool
    {   match self
        {   FallbackTrigger::Timeout => *err == Error::Timeout
          , FallbackTrigger::Any => true
        }
    }
}

/// Provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Which upstream to call
    pub provider: Provider
  , /// Secret for the provider, never logged
    #[serde(skip_serializing)]
    pub api_key: Option<String>
  , /// API base URL (if custom)
    pub api_base: Option<String>
}

impl fmt::Debug for ProviderConfig
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.debug_struct("ProviderConfig")
          .field("provider", &self.provider)
          .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
          .field("api_base", &self.api_base)
          .finish()
    }
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   provider: Provider::DeepSeek
          , api_key: None
          , api_base: None
        }
    }
}

/// Tutor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig
{   /// Upstream provider configuration
    pub provider: ProviderConfig
  , /// Internal deadline for the upstream call, in milliseconds
    pub timeout_ms: u64
  , /// Hard execution ceiling of the host, in milliseconds
    pub host_limit_ms: u64
  , /// Maximum prompt length in characters
    pub max_prompt_chars: usize
  , /// Upstream failures answered from the fallback catalog
    pub fallback_on: FallbackTrigger
  , /// Listen address for the HTTP server
    pub bind_addr: String
}

impl Default for TutorConfig
{   fn default() -> Self
    {   TutorConfig
        {   provider: ProviderConfig::default()
          , timeout_ms: 9_000
          , host_limit_ms: 10_000
          , max_prompt_chars: 500
          , fallback_on: FallbackTrigger::Timeout
          , bind_addr: "0.0.0.0:3000".to_string()
        }
    }
}

impl TutorConfig
{   /// Build from process environment variables
    pub fn from_env() -> Result<Self, Error>
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where F: Fn(&str) -> Option<String>
    {   let defaults = TutorConfig::default();

        let provider = match lookup("TUTOR_PROVIDER")
        {   Some(name) => Provider::from_name(&name).ok_or_else(|| {
              Error::InvalidConfiguration(
                format!("unknown provider: {}", name)
              )
            })?
          , None => defaults.provider.provider
        };

        let api_key = lookup(provider.key_var())
          .map(|k| k.trim().to_string())
          .filter(|k| !k.is_empty());

        let fallback_on = match lookup("TUTOR_FALLBACK_ON")
        {   Some(name) => FallbackTrigger::from_name(&name)
              .ok_or_else(|| {
                Error::InvalidConfiguration(
                  format!("unknown fallback trigger: {}", name)
                )
              })?
          , None => defaults.fallback_on
        };

        let config = TutorConfig
        {   provider: ProviderConfig
            {   provider
              , api_key
              , api_base: lookup("TUTOR_API_BASE")
                  .filter(|b| !b.trim().is_empty())
            }
          , timeout_ms: parse_var(
              &lookup, "TUTOR_TIMEOUT_MS", defaults.timeout_ms
            )?
          , host_limit_ms: parse_var(
              &lookup, "TUTOR_HOST_LIMIT_MS", defaults.host_limit_ms
            )?
          , max_prompt_chars: parse_var(
              &lookup, "TUTOR_MAX_PROMPT_CHARS", defaults.max_prompt_chars
            )?
          , fallback_on
          , bind_addr: lookup("TUTOR_BIND_ADDR")
              .unwrap_or(defaults.bind_addr)
        };

        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Reject configurations the handler cannot honour
    pub fn validate(&self) -> Result<(), Error>
    {   if self.timeout_ms == 0
        {   return Err(Error::InvalidConfiguration(
              "timeout must be greater than zero".to_string()
            ));
        }
        if self.timeout_ms >= self.host_limit_ms
        {   return Err(Error::InvalidConfiguration(format!(
              "timeout ({} ms) must be shorter than the host limit ({} ms)",
              self.timeout_ms, self.host_limit_ms
            )));
        }
        if self.max_prompt_chars == 0
        {   return Err(Error::InvalidConfiguration(
              "max prompt length must be greater than zero".to_string()
            ));
        }
        if self.bind_addr.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "bind address is empty".to_string()
            ));
        }
        Ok(())
    }

    /// Internal deadline as a Duration
    pub fn timeout(&self) -> Duration
    {   Duration::from_millis(self.timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T)
  -> Result<T, Error>
where F: Fn(&str) -> Option<String>
    , T: FromStr
{   match lookup(name)
    {   Some(raw) => raw.trim().parse().map_err(|_| {
          Error::InvalidConfiguration(
            format!("{} is not a valid number: {}", name, raw)
          )
        })
      , None => Ok(default)
    }
}
