//! Image harvesting and downloading.
//!
//! - [`extract`]: finds figure images in HTML pages and reads `og:image`
//! - [`download`]: validated, streamed downloads and the batch driver

pub mod download;
pub mod extract;

pub use download::{ImageDownloader, ImageGroup};
pub use extract::ImageExtractor;
