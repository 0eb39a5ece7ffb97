use log::{error, info};

#[tokio::main]
async fn main()
{   dotenvy::dotenv().ok();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = match tutor_proxy::TutorConfig::from_env()
    {   Ok(config) => config
      , Err(e) => {
          error!("{}", e);
          std::process::exit(1);
        }
    };
    info!(
      "Starting tutor proxy: provider={:?} timeout_ms={} fallback_on={:?}",
      config.provider.provider,
      config.timeout_ms,
      config.fallback_on
    );

    if let Err(e) = tutor_proxy::server::serve(config).await
    {   error!("{}", e);
        std::process::exit(1);
    }
}
