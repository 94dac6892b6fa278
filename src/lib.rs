pub mod answer;
pub mod config;
pub mod document;
pub mod generation;
pub mod retrieval;
pub mod server;
