//! Error, logging, time and crypto utilities shared by the parsing and verification modules

pub mod crypto;
pub mod error;
pub mod logging;
pub mod time_of_interest;

pub use crate::{
    util::crypto::*, util::error::*, util::logging::*, util::time_of_interest::*,
};
