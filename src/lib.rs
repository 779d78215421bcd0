pub mod api;
pub mod cart;
pub mod config;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod migrator;
pub mod rut;
pub mod services;
pub mod telemetry;

pub use sea_orm;
