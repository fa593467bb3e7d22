pub mod db;
pub mod host;
pub mod models;
pub mod monitor;
pub mod overlay;
pub mod system;
