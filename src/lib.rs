pub mod cli;
pub mod config;
pub mod convert;
pub mod encoding;
pub mod error;
pub mod generator;
pub mod parser;
pub mod policy;
pub mod store;
pub mod subscription;

pub use convert::{ConversionOutcome, ResolveFormat, convert, fetch_if_url, resolve};
pub use error::{ConvertError, Result};
