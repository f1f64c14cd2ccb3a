//! Output module
//!
//! Streams the animation to the external renderer over HTTP/SSE.

pub mod sse;
