//! Prompt cleaning and validation

use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use crate::error::Error;
use crate::request::PromptRequest;

static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"[\x00-\x1F\x7F]").expect("control character pattern")
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"\s+").expect("whitespace pattern")
});

/// Strip ASCII control characters, collapse whitespace runs to one
/// space, trim, and cap the length at `max_chars` characters.
///
/// Control characters go first, so `"a\nb"` becomes `"ab"`.
pub fn sanitize(raw: &str, max_chars: usize) -> String
{   let stripped = CONTROL_CHARS.replace_all(raw, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();

    match trimmed.char_indices().nth(max_chars)
    {   Some((cut, _)) => {
          debug!("Truncating prompt to {} characters", max_chars);
          trimmed[..cut].trim_end().to_string()
        }
      , None => trimmed.to_string()
    }
}

/// Parse a raw request body and return the sanitized prompt
pub fn validate(body: &[u8], max_chars: usize)
  -> Result<String, Error>
{   let request: PromptRequest = serde_json::from_slice(body)
      .map_err(|e| {
        debug!("Rejecting unparseable body: {}", e);
        Error::Validation(
          "request body must be a JSON object with a prompt".to_string()
        )
      })?;

    let raw = match request.prompt
    {   Some(serde_json::Value::String(s)) if !s.is_empty() => s
      , _ => {
          return Err(Error::Validation(
            "prompt is required and must be text".to_string()
          ));
        }
    };

    let prompt = sanitize(&raw, max_chars);
    if prompt.is_empty()
    {   return Err(Error::Validation(
          "prompt is empty after sanitization".to_string()
        ));
    }
    if prompt.chars().count() > max_chars
    {   return Err(Error::Validation(format!(
          "prompt is too long (maximum {} characters)", max_chars
        )));
    }
    Ok(prompt)
}
