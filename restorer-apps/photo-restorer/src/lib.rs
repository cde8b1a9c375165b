mod app;
mod services;

use std::sync::Arc;

use anyhow::Result;
use restorer_axum::AxumApp;
use restorer_blob::{BlobAdapter, BlobStore};
use restorer_genai::ImageModel;

pub use app::{BlobBackend, RestorerSettings};
pub use services::restorations::{InlineRestore, RestorationsService, ResultSource};

/// The assembled server: router plus the settings it was built from.
pub struct PhotoRestorer {
    pub ax: AxumApp,
    pub settings: Arc<RestorerSettings>,
}

impl PhotoRestorer {
    pub async fn listen(self) -> Result<()> {
        let addr = self.settings.addr();
        self.ax.listen(addr).await
    }
}

/// Build from `RESTORER__*` and `GEMINI_API_KEY`.
pub async fn build() -> Result<PhotoRestorer> {
    let config = app::load_config();
    let settings = RestorerSettings::from_config(&config.snapshot())?;
    let store = app::blob_store(&settings).await?;
    let model = app::image_model(&settings)?;
    Ok(build_with(settings, store, model))
}

/// Build over an explicit store and model.
pub fn build_with(
    settings: RestorerSettings,
    store: Arc<dyn BlobStore>,
    model: Option<Arc<dyn ImageModel>>,
) -> PhotoRestorer {
    let settings = Arc::new(settings);
    let blobs = BlobAdapter::from_arc(store, settings.blob.clone());
    let routes = services::configure(blobs, model, Arc::clone(&settings));

    let ax = AxumApp::new()
        .mount(&settings.public_prefix, routes)
        .use_get("/health", || async { "ok" })
        .with_default_layers();

    PhotoRestorer { ax, settings }
}
