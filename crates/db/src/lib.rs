pub mod connection;
pub mod indexes;
pub mod migrations;
pub mod models;

pub use connection::connect;
