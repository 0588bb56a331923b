mod api_url;
mod backend;
mod client;
mod credentials;
mod dev_backend;

pub mod annotate;
pub mod domain;
pub mod export;
pub mod lifecycle;
pub mod planner;
pub mod report;
pub mod reviewer;
pub mod roles;

pub use api_url::*;
pub use backend::*;
pub use client::*;
pub use credentials::*;
pub use dev_backend::*;
