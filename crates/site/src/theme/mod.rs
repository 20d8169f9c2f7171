//! Theme engine and template rendering.
//!
//! Provides Tera-based template rendering with template suggestion
//! resolution and form-to-HTML conversion.

mod engine;

pub use engine::ThemeEngine;
