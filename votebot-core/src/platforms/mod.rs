// File: src/platforms/mod.rs

pub mod console;
pub mod mojang;

pub use console::{ConsoleBridge, StandardCatalog};
pub use mojang::MojangIdentityResolver;
