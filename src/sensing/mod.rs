//! Sensors feeding the focus score: input activity, camera frames and the facial classifier.
//! Each one degrades to a synthetic stand-in instead of failing.

pub mod activity;
pub mod camera;
pub mod vision;
