// src/lib.rs — Library root for fitdash

pub mod cli;
pub mod infra;
pub mod polling;
pub mod widgets;
