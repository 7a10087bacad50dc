//! # Media Server
//!
//! The HTTP side of Chefpup: a handful of thin axum handlers over the
//! filesystem.
//!
//! ## Endpoints
//!
//! | Path | Description |
//! |------|-------------|
//! | `GET /audio/{id}` | Pre-recorded clip `{id}.wav`, `id` in 1..=5, with `Range` support (200 whole, 206 slice) |
//! | `GET /video` | The configured video, with `Range` support (200 whole, 206 slice) |
//! | `GET /looping-video` | The background loop, with `Range` support (200 whole, 206 slice) |
//! | `POST /upload` | Multipart `video` + `audio1`..`audio4` into the upload directory |
//! | `GET /check-files` | `{ "exist": bool }` for the upload directory |
//! | `GET /uploads/*` | Static files from the upload directory |
//!
//! A missing or unreadable file is a 500 with `{ "error": ... }`: "Failed to
//! serve audio file" for clips, "Failed to serve video file" for either video.
//!
//! ## Layout
//!
//! - [`range`]: `Range` header interpretation.
//! - [`files`]: streaming a file (or a slice of it) as a response.
//! - [`uploads`]: the fixed-layout upload directory.
//! - [`routes`]: router, shared state and the handlers themselves.

pub mod files;
pub mod range;
pub mod routes;
pub mod uploads;

pub use routes::{create_router, start_server, AppState};
