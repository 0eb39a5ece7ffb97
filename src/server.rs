//! HTTP surface: one handler on every path, CORS, body limit, serve loop

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use log::{info, error};

use crate::config::TutorConfig;
use crate::error::Error;
use crate::handler::{Outcome, TutorService};

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

impl IntoResponse for Outcome
{   fn into_response(self) -> Response
    {   match self.envelope
        {   None => self.status.into_response()
          , Some(envelope) => {
              let mut response = (self.status, Json(envelope))
                .into_response();
              if self.status == StatusCode::METHOD_NOT_ALLOWED
              {   response.headers_mut().insert(
                    header::ALLOW,
                    HeaderValue::from_static("POST, OPTIONS")
                  );
              }
              response
            }
        }
    }
}

/// Build the router: every path and method goes to the tutor handler
pub fn create_router(service: TutorService) -> Router
{   let cors = CorsLayer::new()
      .allow_origin(Any)
      .allow_methods([Method::POST, Method::OPTIONS])
      .allow_headers([header::CONTENT_TYPE]);

    Router::new()
      .fallback(handle_tutor_request)
      .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
      .layer(cors)
      .with_state(service)
}

async fn handle_tutor_request(
  State(service): State<TutorService>
, method: Method
, body: Result<Bytes, BytesRejection>
) -> Outcome
{   match body
    {   Ok(body) => service.handle(&method, &body).await
      , Err(rejection) => {
          let err = match rejection.status().as_u16()
          {   413 => Error::PayloadTooLarge
            , _ => Error::Validation(
                "request body could not be read".to_string()
              )
          };
          service.refuse_body(&method, err)
        }
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: TutorConfig) -> Result<(), Error>
{   let addr = config.bind_addr.clone();
    let service = TutorService::new(config);
    let app = create_router(service);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
      error!("Failed to bind {}: {}", addr, e);
      Error::InvalidConfiguration(format!("cannot bind {}: {}", addr, e))
    })?;
    info!("Tutor proxy listening on http://{}", addr);

    axum::serve(listener, app)
      .with_graceful_shutdown(shutdown_signal())
      .await
      .map_err(|e| Error::Other(format!("server error: {}", e)))?;

    info!("Tutor proxy stopped");
    Ok(())
}

async fn shutdown_signal()
{   if let Err(e) = tokio::signal::ctrl_c().await
    {   error!("Failed to listen for shutdown signal: {}", e);
    }
}
