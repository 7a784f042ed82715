pub mod cli;
pub mod errors;
pub mod files;
pub mod mapper;
pub mod trade;
