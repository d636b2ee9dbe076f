pub mod client;
pub mod client_method;
pub mod client_model;
pub mod proxy;
pub mod types;

pub use client::*;
pub use client_method::*;
pub use client_model::*;
pub use proxy::*;
pub use types::*;
