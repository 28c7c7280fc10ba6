pub mod cache;
pub mod config;
pub mod level;
pub mod posterior;
pub mod results;
pub mod rotation;
pub mod special;
pub mod stats;
