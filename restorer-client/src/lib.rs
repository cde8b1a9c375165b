//! Photo restorer HTTP client.
//!
//! ```no_run
//! use restorer_client::{ImageUpload, PollPolicy, RestorationFlow, RestorerClient};
//!
//! # async fn example() -> Result<(), restorer_client::ClientError> {
//! let client = RestorerClient::builder("http://localhost:3030").build()?;
//! let flow = RestorationFlow::new(client, PollPolicy::default());
//!
//! let photo = ImageUpload::new(std::fs::read("old.jpg").unwrap(), "old.jpg", "image/jpeg");
//! let url = flow.run_polling(&photo).await?;
//! println!("restored image at {url}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod machine;

pub use client::{
    FetchedImage, ImageUpload, RestoredImage, RestorerClient, RestorerClientBuilder,
    DEFAULT_API_PREFIX,
};
pub use error::ClientError;
pub use machine::{ClientPhase, PollPolicy, RestorationFlow};
