pub mod compose;
pub mod config;
pub mod disk;
pub mod env_file;
pub mod health;
pub mod model;
pub mod render;
pub mod runtime;
pub mod scanner;
pub mod theme;
