//! Color values shared by sprites, lights, clears and placeholders.

mod color;

pub use color::Color;
