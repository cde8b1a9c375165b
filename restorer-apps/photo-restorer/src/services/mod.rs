use std::sync::Arc;

use axum::Router;
use restorer_blob::BlobAdapter;
use restorer_genai::ImageModel;

use crate::app::RestorerSettings;

pub mod restorations;

pub fn configure(
    blobs: BlobAdapter,
    model: Option<Arc<dyn ImageModel>>,
    settings: Arc<RestorerSettings>,
) -> Router<()> {
    let service = restorations::RestorationsService::new(blobs, model, settings);
    restorations::routes(service)
}
