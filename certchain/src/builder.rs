//! Loading certificates and CRLs from files and folders
#![cfg(feature = "fs")]

pub mod file_utils;

pub use crate::builder::file_utils::*;
