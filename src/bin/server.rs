use std::sync::Arc;

use gitreadme::api::{router, AppState};
use gitreadme::{logging, Config, GitHubSource, ReadmeGenerator};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let level = std::env::var("GITREADME_LOG").unwrap_or_else(|_| "info".to_string());
    logging::init(&level)?;

    let config = Arc::new(Config::load_default()?);

    // A generator that cannot start leaves the server up, answering 503
    let state = match build_generator(config.clone()) {
        Ok(generator) => {
            info!(
                model = generator.config().llm.model(),
                references = generator.reference_count(),
                "README generator ready"
            );
            AppState::ready(Arc::new(generator))
        }
        Err(e) => {
            error!("README generator unavailable: {}", e);
            AppState::uninitialized()
        }
    };

    let app = router(state, &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.server.bind.as_str()).await?;
    info!("Server listening on http://{}", config.server.bind);
    info!("Health check: http://{}/health", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_generator(config: Arc<Config>) -> gitreadme::Result<ReadmeGenerator> {
    let source = Arc::new(GitHubSource::new(config.github_token.as_deref())?);
    ReadmeGenerator::from_config(config, source)
}
