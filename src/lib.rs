//! finmate: a client for a personal-finance dashboard service.
//!
//! The library turns the raw list of a user's transactions into dashboard figures
//! ([`aggregate`]), keeps a local copy of that list in step with the service ([`cache`]), and
//! decides whether the landing page or the dashboard should be shown ([`gate`]) based on whether a
//! credential is stored ([`session`]).

pub mod aggregate;
pub mod api;
pub mod args;
pub mod cache;
pub mod commands;
mod config;
mod error;
pub mod gate;
pub mod model;
pub mod session;
mod utils;


pub use config::Config;
pub use error::{ApiError, ApiResult, Error, MutationError, Result};
