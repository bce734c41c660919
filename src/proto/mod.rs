//! Generated protobuf message types for the OSM PBF wire format.
//!
//! `fileformat.proto` and `osmformat.proto` are the canonical schema from
//! the OpenStreetMap OSM-binary project. The Rust bindings are produced at
//! build time by `build.rs` via `protobuf-codegen`; nothing under this
//! module is hand-written.

include!(concat!(env!("OUT_DIR"), "/proto/mod.rs"));
