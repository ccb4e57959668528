pub mod config;
pub mod encryption;
pub mod error;
pub mod request;

pub use config::{ApiContext, ClientCredential};
pub use error::{ClientError, Result};
pub use request::builder::RequestBuilder;
pub use request::kinds::ApiKind;
