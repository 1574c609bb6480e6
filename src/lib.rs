pub mod app;
pub mod client;
pub mod conf;
pub mod error;
pub mod key;
pub mod transform;
pub mod trigger;
