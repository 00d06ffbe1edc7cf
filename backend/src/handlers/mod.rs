//! HTTP request handlers

pub mod auth;
pub mod customer;
pub mod expense;
pub mod health;
pub mod product;
pub mod reporting;
pub mod sale;
pub mod supplier;

pub use auth::*;
pub use customer::*;
pub use expense::*;
pub use health::*;
pub use product::*;
pub use reporting::*;
pub use sale::*;
pub use supplier::*;
