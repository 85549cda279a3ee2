pub mod bench;
pub mod report;

pub use bench::*;
pub use report::*;
