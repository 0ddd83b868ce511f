pub mod availability;
pub mod catalog;
pub mod health;
pub mod wizard;
