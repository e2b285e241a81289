//! Run MotEvo transcription factor binding site predictions and parse its output

pub mod config;
pub mod error;
pub mod parse;
pub mod plot;
pub mod pwm;
pub mod run;
pub mod types;
