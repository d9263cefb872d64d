//! Feature modules - business logic separated from the command line
//!
//! Each feature module contains the core logic for a specific functionality.

pub mod batch;
pub mod encoding;
pub mod lyrics;
pub mod media;
pub mod settings;

pub use settings::{Settings, WriteSettings};
