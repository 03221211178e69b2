pub mod config;
pub mod controller;
pub mod drag;
pub mod filter;
pub mod hierarchy;
pub mod layout;
pub mod limits;
pub mod loader;
pub mod model;
pub mod notify;
pub mod observability;
pub mod script;
pub mod selection;
pub mod store;
pub mod throttle;
pub mod timeline;
pub mod virtualize;
