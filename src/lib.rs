pub mod catalog;
pub mod clients;
pub mod config;
pub mod email;
pub mod files;
pub mod insights;
pub mod session;
pub mod shared;
pub mod team;
