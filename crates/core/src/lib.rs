#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod time;

pub use catalog::{Site, SiteCatalog};
pub use time::Clock;
