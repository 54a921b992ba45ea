//! Chain building and verification, profiles, name matching and verification settings

pub mod chain;
pub mod flags;
pub mod name;
pub mod parent;
pub mod profile;
pub mod settings;

pub use crate::validator::{
    chain::*, flags::*, name::*, parent::*, profile::*, settings::*,
};
