//! Prompt documents for a downstream image generator
//!
//! Turns validated form input (palette, theme, style, optional text overlay,
//! optional reference image URL) into the JSON constraint document the
//! generator consumes.

mod builder;
mod color;
mod error;
mod schema;

pub use builder::{
    build_prompt, Aesthetics, Composition, Constraints, Output, Overlays, Prompt, PromptOut,
    References, TextBlock,
};
pub use color::hex_to_rgba;
pub use error::{FieldError, PromptError, Result};
pub use schema::{ColorWithAlpha, FormDataIn};
