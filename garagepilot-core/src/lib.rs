//! Core of the GaragePilot repair shop backend: inventory, appointments,
//! work orders and quotations over a JSON-file record store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod models;
pub mod pipeline;

pub use error::{ShopError, ShopResult};
