//! Composite 64-bit symbol identifiers.
//!
//! Function keys pack `module:16 | file:24 | function:24`, block keys pack
//! `module:16 | block:48`, most significant bits first. The module id selects
//! the debug-info store that resolves the remaining components.

use serde::{Deserialize, Serialize};

const MODULE_SHIFT: u32 = 48;
const MODULE_MASK: u64 = 0xffff;
const FILE_SHIFT: u32 = 24;
const FILE_MASK: u64 = 0xff_ffff;
const FUNCTION_MASK: u64 = 0xff_ffff;
const BLOCK_MASK: u64 = 0xffff_ffff_ffff;

/// Decode a function id into `(module_id, function_id, file_id)`
pub fn decode_function_id(id: u64) -> (u16, u32, u32) {
    let module = ((id >> MODULE_SHIFT) & MODULE_MASK) as u16;
    let file = ((id >> FILE_SHIFT) & FILE_MASK) as u32;
    let function = (id & FUNCTION_MASK) as u32;
    (module, function, file)
}

/// Encode `(module_id, function_id, file_id)`; components are masked to their widths
pub fn encode_function_id(module_id: u16, function_id: u32, file_id: u32) -> u64 {
    (u64::from(module_id) << MODULE_SHIFT)
        | ((u64::from(file_id) & FILE_MASK) << FILE_SHIFT)
        | (u64::from(function_id) & FUNCTION_MASK)
}

/// Decode a block id into `(module_id, block_id)`
pub fn decode_block_id(id: u64) -> (u16, u64) {
    let module = ((id >> MODULE_SHIFT) & MODULE_MASK) as u16;
    (module, id & BLOCK_MASK)
}

pub fn encode_block_id(module_id: u16, block_id: u64) -> u64 {
    (u64::from(module_id) << MODULE_SHIFT) | (block_id & BLOCK_MASK)
}

/// The module half of a composite id, shared by both key kinds
///
/// The instrumentation pass starts module ids at -1 until a store is
/// allocated, so a set sign bit means the id was packed before allocation.
pub fn module_is_negative(module_id: u16) -> bool {
    (module_id as i16) < 0
}

/// Decoded function key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey {
    pub module_id: u16,
    pub file_id: u32,
    pub function_id: u32,
}

impl FunctionKey {
    pub fn decode(id: u64) -> Self {
        let (module_id, function_id, file_id) = decode_function_id(id);
        Self {
            module_id,
            file_id,
            function_id,
        }
    }

    pub fn encode(&self) -> u64 {
        encode_function_id(self.module_id, self.function_id, self.file_id)
    }
}

/// Decoded basic-block key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKey {
    pub module_id: u16,
    pub block_id: u64,
}

impl BlockKey {
    pub fn decode(id: u64) -> Self {
        let (module_id, block_id) = decode_block_id(id);
        Self {
            module_id,
            block_id,
        }
    }

    pub fn encode(&self) -> u64 {
        encode_block_id(self.module_id, self.block_id)
    }
}
