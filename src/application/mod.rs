// Application layer: the async service clients talk to, its errors and report shapes.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
