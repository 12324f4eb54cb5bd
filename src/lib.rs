//! Terminal productivity monitor. Samples facial expression from a webcam and keyboard/mouse
//! activity, blends them into a focus score and suggests what kind of task fits the moment.

pub mod cli;
pub mod monitor;
pub mod sensing;
pub mod suggestion;
pub mod utils;
