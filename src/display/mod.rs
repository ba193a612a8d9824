//! Display surface.
//!
//! The engine decides what is on screen; a surface draws it and reports
//! images it could not load so the engine can substitute a placeholder.

pub mod terminal;

pub use terminal::TerminalSurface;

use crate::catalog::ImageRef;
use crate::engine::{Frame, Status};
use thiserror::Error;

/// Surface errors
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The frame's image could not be loaded; not fatal
    #[error("Failed to load {reference}: {reason}")]
    AssetLoad { reference: ImageRef, reason: String },

    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Something that can put a frame on screen
pub trait DisplaySurface {
    fn show(&mut self, frame: &Frame, status: &Status) -> Result<(), SurfaceError>;
}
