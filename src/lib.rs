pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod render;
pub mod store;
pub mod validation;
pub mod web;
