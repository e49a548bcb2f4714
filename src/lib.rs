//! cvharvest - Resume acquisition and candidate extraction system.
//!
//! A tool for pulling resume documents out of a remote folder, extracting
//! candidate contact fields from them, and writing the results to a
//! spreadsheet while tracking batch progress durably on disk.

pub mod cli;
pub mod config;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod ocr;
pub mod parser;
pub mod remote;
pub mod utils;
