pub mod cli;
pub mod error;
pub mod session;
pub mod signals;
pub mod summary;

pub use error::Error;
