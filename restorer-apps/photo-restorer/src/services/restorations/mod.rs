pub mod restorations_routes;
pub mod restorations_service;

pub use restorations_routes::routes;
pub use restorations_service::{InlineRestore, RestorationsService, ResultSource};
