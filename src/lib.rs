//! Logistic-loss classifiers for the South African heart disease data.
//!
//! The batch flow is linear: load the CSV, one-hot encode `famhist`, split
//! rows into train and test sets, plot every feature against `chd`, fit an
//! SGD log-loss classifier and smartcore's logistic regression, and report
//! their test accuracy.

pub mod cli;
pub mod encode;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod records;
pub mod report;
pub mod sgd;
pub mod split;

pub use error::{HeartAppError, Result};
