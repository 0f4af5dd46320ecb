pub mod error;
pub mod image;
pub mod info;
mod info_display;
pub mod logger;
pub(crate) mod traits;
