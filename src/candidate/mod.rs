//! Candidate pruning across template scan results.
//!
//! Includes IoU-based non-maximum suppression over labelled boxes.

pub mod nms;
