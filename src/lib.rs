#![allow(warnings)]

pub mod arguments;
pub mod broker;
pub mod config;
pub mod errors; // Structured error handling
pub mod global;
pub mod indicators;
pub mod instruments;
pub mod logger;
pub mod marketdata;
pub mod paths;
pub mod positions;
pub mod run;
pub mod services;
pub mod shutdown;
pub mod signals;
pub mod summary;
pub mod trader;
pub mod utils;
pub mod watchlist;
