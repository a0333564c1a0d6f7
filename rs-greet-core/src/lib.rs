//! Random greeting generation and no-repeat media rotation.
//!
//! This crate provides:
//! - A skewed integer sampler biased toward the low end of a range
//! - Token graphs rendered into sentences, with text computed at render time
//! - The morning greeting graph and its emoji suffix
//! - Catalogs of stickers and media handed out without repeats until a
//!   whole catalog has been delivered
//! - Time windows and daily scheduling helpers
//!
//! File loading and saving stay internal; callers go through [`config`]
//! and [`rotation`].

pub mod config;
pub mod error;
pub mod morning;
pub mod registry;
pub mod rotation;
pub mod sampler;
pub mod sentence;
pub mod text;
pub mod timing;
pub mod token;

/// I/O utilities (YAML files, atomic saves, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{GreetError, Result};
pub use morning::generate_greeting_text;
pub use sampler::skewed_random;
