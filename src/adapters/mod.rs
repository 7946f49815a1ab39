// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod cloudinary;
pub mod memory;
pub mod postgres;
