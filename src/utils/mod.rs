//! Shared helpers.

pub mod html;
pub mod text;
