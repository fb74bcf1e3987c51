pub mod config;
pub mod scan;
pub mod suggest;
