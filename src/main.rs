use anyhow::{Context, Result};
use log::info;
use sagaforge::api::{self, AppState};
use sagaforge::core::catalog::FixtureCatalog;
use sagaforge::core::config::Config;
use sagaforge::core::io::{NativeStorage, Storage};
use sagaforge::services::image::create_image_generator;
use sagaforge::services::llm::create_llm;
use sagaforge::services::render::TypstRenderer;
use sagaforge::services::workflow::BookWorkflow;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1. Load config
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    // 2. Load fixtures; the server is useless without them
    let storage: Arc<dyn Storage> = Arc::new(NativeStorage::new());
    let catalog = FixtureCatalog::load(storage.as_ref(), &config.data_folder).await?;

    // 3. Collaborators
    let llm = create_llm(&config)?;
    let image = create_image_generator(&config)?;
    if image.is_none() {
        info!("No image provider configured; books will have no cover");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let workflow = BookWorkflow::new(config, llm, image, storage, catalog, Box::new(TypstRenderer::new()));
    let app = api::router(Arc::new(AppState { workflow }));

    // 4. Serve
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
