pub mod error;
pub mod harness;
pub mod report;
pub mod run;
pub mod scenario;

pub use error::NotebenchError;
