//! Multimodal journey planner.
//!
//! Answers "how do I get from here to there, leaving at (or arriving by)
//! this time?" over a transit timetable, shared bikes and walking, using a
//! round-based search.

pub mod bikes;
pub mod cache;
pub mod config;
pub mod delay;
pub mod domain;
pub mod feed;
pub mod network;
pub mod planner;
pub mod snapshot;
pub mod web;
