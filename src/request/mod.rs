pub mod builder;
pub mod kinds;

pub use builder::RequestBuilder;
pub use kinds::{prepare, ApiKind};
