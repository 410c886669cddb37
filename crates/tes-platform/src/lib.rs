//! Tessera platform
//!
//! Core library for the Tessera event ticketing service: accounts and
//! tokens, the event catalog, ticket booking, participant feedback, and
//! the producer side of the email queue. The HTTP surface lives in
//! `api`; binaries assemble routers and state from here.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod naming;
pub mod repository;
pub mod service;

pub use config::AppConfig;
pub use domain::*;
pub use error::{Result, ServiceError};
