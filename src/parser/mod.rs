//! Trace decoding and identifier definitions.
//!
//! This module handles:
//! - Decoding/encoding the binary trace format
//! - Unpacking composite function and block identifiers
//! - The in-memory trace record

pub mod identifier;
pub mod schema;
pub mod trace_codec;

// Re-export main types
pub use identifier::{
    decode_block_id, decode_function_id, encode_block_id, encode_function_id, module_is_negative,
    BlockKey, FunctionKey,
};
pub use schema::{Arch, CollectionMode, Histogram, SymbolSeries, TraceRecord};
pub use trace_codec::{
    decode, decode_batch, decode_labeled, encode, read_trace, write_trace, DecodedBatch,
};
