pub mod health;
pub mod tasks;
pub mod layout;
pub mod execution;
