//! # Time Agent MCP Server Core
//!
//! City-based time and weather operations plus the deterministic answer
//! layer that sits between the tool-calling loop and the final response.
//!
//! ## Modules
//! - `error`: Custom error types and error handling
//! - `models`: Data structures for requests and responses
//! - `geocode`: City name resolution via the Open-Meteo geocoding API
//! - `provider`: Current-time and time-conversion operations per city
//! - `weather`: Today's weather lookup per city
//! - `agent`: Message trace types and the model-driven tool loop
//! - `assembler`: Deterministic answer construction from the trace

pub mod agent;
pub mod assembler;
pub mod error;
pub mod geocode;
pub mod models;
pub mod provider;
pub mod weather;
