//! Domain models for the Retail POS backend

mod expense;
mod party;
mod product;
mod report;
mod sale;
mod user;

pub use expense::*;
pub use party::*;
pub use product::*;
pub use report::*;
pub use sale::*;
pub use user::*;
