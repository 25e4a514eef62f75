//! HTTP handlers

pub mod health;
pub mod spoofr;
pub mod dashboard;
