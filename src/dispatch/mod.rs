//! Request routing for the bus reply endpoints.

mod command;
mod health;

pub use command::CommandHandler;
pub use health::HealthHandler;
