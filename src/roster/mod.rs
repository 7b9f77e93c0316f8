pub mod assign;
pub mod driver;
pub mod error;
