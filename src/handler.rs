//! Per-request pipeline: validate, dispatch under the deadline,
//! fall back, and shape the envelope.

use std::sync::Arc;
use std::time::Instant;
use axum::http::{Method, StatusCode};
use log::{debug, error, info, warn};

use crate::config::TutorConfig;
use crate::deadline::{self, Raced};
use crate::error::Error;
use crate::fallback;
use crate::providers::Upstream;
use crate::request::{estimate_tokens, Envelope};
use crate::sanitize;

/// `modelo` tag for catalog answers
pub const FALLBACK_MODEL_TAG: &str = "Fallback (non-AI)";

/// `modelo` tag for the configuration probe
pub const TEST_MODE_TAG: &str = "Test Mode";

/// Result of handling one request: a status and, except for
/// preflight, an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome
{   pub status: StatusCode
  , pub envelope: Option<Envelope>
}

impl Outcome
{   fn answered(envelope: Envelope) -> Self
    {   Outcome
        {   status: StatusCode::OK
          , envelope: Some(envelope)
        }
    }

    fn failed(err: &Error) -> Self
    {   Outcome
        {   status: err.status()
          , envelope: Some(Envelope::failure(err.client_message()))
        }
    }

    fn preflight() -> Self
    {   Outcome
        {   status: StatusCode::OK
          , envelope: None
        }
    }
}

/// Stateless tutoring handler. The API key is injected through the
/// configuration; nothing is read from the environment per request.
#[derive(Debug, Clone)]
pub struct TutorService
{   config: Arc<TutorConfig>
  , upstream: Option<Arc<Upstream>>
}

impl TutorService
{   pub fn new(config: TutorConfig) -> Self
    {   let upstream = config.provider.api_key.clone()
          .map(|key| Arc::new(Upstream::new(&config.provider, key)));
        if upstream.is_none()
        {   warn!(
              "No API key configured for {:?}; prompts will be refused",
              config.provider.provider
            );
        }
        TutorService
        {   config: Arc::new(config)
          , upstream
        }
    }

    pub fn config(&self) -> &TutorConfig
    {   &self.config
    }

    /// Whether the provider secret is present
    pub fn key_configured(&self) -> bool
    {   self.upstream.is_some()
    }

    /// Handle one request; every path ends in exactly one outcome
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Outcome
    {   if let Some(outcome) = screen_method(method)
        {   return outcome;
        }

        match self.answer(body).await
        {   Ok(envelope) => Outcome::answered(envelope)
          , Err(err) => {
              match &err
              {   Error::Validation(msg) => {
                    info!("Rejected prompt: {}", msg);
                  }
                , other => error!("Request failed: {}", other)
              }
              Outcome::failed(&err)
            }
        }
    }

    /// Outcome for a request whose body was refused before it could be
    /// read. The method is still checked first.
    pub fn refuse_body(&self, method: &Method, err: Error) -> Outcome
    {   if let Some(outcome) = screen_method(method)
        {   return outcome;
        }
        info!("Rejected request body: {}", err);
        Outcome::failed(&err)
    }

    async fn answer(&self, body: &[u8]) -> Result<Envelope, Error>
    {   let prompt = sanitize::validate(body, self.config.max_prompt_chars)?;
        info!(
          "Processing request: prompt_length={}",
          prompt.chars().count()
        );

        if prompt.eq_ignore_ascii_case("test")
        {   return Ok(self.test_mode());
        }

        let upstream = self.upstream.as_ref().ok_or_else(|| {
          error!(
            "{} not configured",
            self.config.provider.provider.key_var()
          );
          Error::MissingApiKey(
            self.config.provider.provider.key_var().to_string()
          )
        })?;

        let started = Instant::now();
        let result = match deadline::race(
          upstream.send_prompt(&prompt),
          self.config.timeout()
        ).await
        {   Raced::Finished(result) => result
          , Raced::Expired => {
              warn!(
                "Upstream timed out after {} ms",
                self.config.timeout_ms
              );
              Err(Error::Timeout)
            }
        };

        match result
        {   Ok(reply) => {
              let envelope = Envelope::from_reply(reply);
              info!(
                "Request processed: model={} tokens={} elapsed_ms={}",
                upstream.model_tag(),
                envelope.tokens.unwrap_or_default(),
                started.elapsed().as_millis()
              );
              Ok(envelope)
            }
          , Err(err) if self.config.fallback_on.covers(&err) => {
              warn!("Answering from fallback catalog ({})", err);
              Ok(fallback_answer(&prompt))
            }
          , Err(err) => Err(err)
        }
    }

    fn test_mode(&self) -> Envelope
    {   info!("Test mode probe");
        Envelope::answer(
          format!(
            "API reachable. Key configured: {}",
            self.key_configured()
          ),
          0,
          TEST_MODE_TAG
        )
    }
}

/// Preflight and method checks shared by every request
fn screen_method(method: &Method) -> Option<Outcome>
{   if *method == Method::OPTIONS
    {   return Some(Outcome::preflight());
    }
    if *method != Method::POST
    {   debug!("Rejecting {} request", method);
        return Some(Outcome::failed(
          &Error::MethodNotAllowed(method.to_string())
        ));
    }
    None
}

/// Envelope for a catalog answer, shaped like a model answer
fn fallback_answer(prompt: &str) -> Envelope
{   let text = fallback::respond(prompt);
    let tokens = estimate_tokens(&text);
    Envelope::answer(text, tokens, FALLBACK_MODEL_TAG)
}
