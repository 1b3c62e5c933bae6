//! Route modules for Keepsake Server

pub mod assets;
pub mod gallery;
pub mod health;
pub mod upload;
