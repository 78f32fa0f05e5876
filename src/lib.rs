//! Clubhouse - a small members-area web app
//!
//! This library provides signup, login, and server-side session handling
//! behind a form-and-redirect HTTP surface.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
