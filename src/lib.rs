//! Persistence layer for a recipe publishing site.
//!
//! Recipes and categories are stored in SQLite behind an explicit
//! [`Repository`]; saving a recipe derives its URL slug from the title when
//! absent and downscales the associated cover image on disk. Routing,
//! templating, auth and the admin surface belong to the host application.

pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;

pub use config::Config;
pub use db::Repository;
pub use error::{AppError, Result};
