pub mod artifact;
pub mod backend;
pub mod feed;
pub mod spec;
pub mod tensor;

pub use artifact::*;
pub use backend::*;
pub use feed::*;
pub use spec::*;
pub use tensor::*;
