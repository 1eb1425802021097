pub mod config;
pub mod db;
pub mod report;
pub mod server;

pub use server::serve;
