//! Individual preprocessing steps

pub mod contrast;
pub mod grayscale;
