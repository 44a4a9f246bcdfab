//! `skylapse-core` -- domain logic for rendering night-sky timelapses.
//!
//! The pipeline runs leaf-first: [`solar`] resolves the start time,
//! [`template`] turns a request into a planetarium startup script,
//! [`render`] drives the planetarium until every frame is on disk, and
//! [`ffmpeg`] encodes the frames into a video. Nothing in this crate reads
//! the environment or parses command lines; see the `skylapse` binary crate.

pub mod duration;
pub mod error;
pub mod ffmpeg;
pub mod prerequisites;
pub mod render;
pub mod request;
pub mod solar;
pub mod start_time;
pub mod template;
pub mod tool;
pub mod types;
pub mod window;
