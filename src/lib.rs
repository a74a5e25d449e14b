pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fuzzy;
pub mod index;
pub mod matcher;
pub mod output;
pub mod screen;
pub mod source;
pub mod store;
pub mod summary;
pub mod table;
pub mod tools;
