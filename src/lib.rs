pub mod cache;
pub mod cache_error;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod fs;
pub mod graph;
pub mod lock;
pub mod logging;
pub mod parser;
pub mod paths;
pub mod query;
pub mod store;
pub mod ticket;
pub mod types;
pub mod utils;

pub use error::{ErrorKind, Result, TixError};
pub use store::TicketStore;
pub use ticket::NewTicket;
