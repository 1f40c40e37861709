//! Core domain logic for workshop authentication and presence

pub mod auth;
pub mod config;
pub mod db;
pub mod presence;
pub mod response;
pub mod validation;

#[cfg(test)]
mod tests;
