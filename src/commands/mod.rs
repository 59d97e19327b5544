pub mod cluster;
pub mod utils;
