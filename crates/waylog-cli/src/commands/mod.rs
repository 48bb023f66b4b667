pub mod config;
pub mod locations;
pub mod track;
