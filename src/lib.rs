//! specpulse library interface
//!
//! Loads an OpenAPI/Swagger document, works out what each endpoint needs and
//! calls the endpoints a user picks.
//!
//! # Module Organization
//!
//! - [`openapi`] - Loading and normalizing documents (enhanced and minimal parsers)
//! - [`auth`] - Security requirements, credentials and OAuth2 tokens
//! - [`select`] - Endpoint listing and selection
//! - [`collect`] - Parameter and body collection
//! - [`request`] - Request plans
//! - [`client`] - Executing plans
//! - [`prompt`] - Terminal and scripted prompting
//! - [`core`] - Run orchestration

pub mod auth;
pub mod cli;
pub mod client;
pub mod collect;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod openapi;
pub mod output;
pub mod prompt;
pub mod request;
pub mod select;
pub mod signals;
pub mod status;
