pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod package;
pub mod recipe;
pub mod runtime;

pub use error::RecipeError;
pub use recipe::Recipe;
