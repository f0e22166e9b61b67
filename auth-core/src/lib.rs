pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;
pub mod utils;

pub use bootstrap::{init_observability, AuthServiceBuilder};
pub use controller::{AuthController, ProviderSet};
pub use services::{AuthError, AuthService};
