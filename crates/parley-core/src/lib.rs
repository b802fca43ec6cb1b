//! Business logic and repository trait definitions for Parley.
//!
//! This crate defines the "ports" (repository, auth and transport traits)
//! that the infrastructure layer implements. It depends only on
//! `parley-types` -- never on `parley-infra` or any database/IO crate.

pub mod auth;
pub mod chat;
pub mod document;
pub mod repository;
pub mod shell;
pub mod turn;
