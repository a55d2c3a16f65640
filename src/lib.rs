#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod data;
pub mod error;
pub mod import_export;
pub mod state;
pub mod store;
