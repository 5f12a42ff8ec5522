//! Tooling primitives for deterministic game AI.
//!
//! Lightweight and engine-agnostic: trace events, sinks, and a recorder that plugs into the
//! `AiObserver` hooks of the behavior-tree and GOAP engines.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    NullTraceSink, TraceEvent, TraceLog, TraceRecorder, TraceSink, TracingSink, VecTraceSink,
};
