use xxhash_rust::xxh3::xxh3_128;

use crate::executor::{InstructionMemory, MAX_BLOCK_SIZE};

/// Identifies a block by code content rather than address: two ranges with
/// byte-identical instruction streams of the same length share one key and,
/// deliberately, one compiled translation.
///
/// Only the 128-bit fingerprint and the byte length are compared; a collision
/// across genuinely different content is treated as impossible.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub hash: u128,
    pub length: u32,
}

/// Fingerprint the instruction words spanning `begin..=end`.
///
/// Words are copied slot by slot (lower op, then upper op) into a scratch
/// buffer that lives on the stack for this call only, then hashed in one
/// pass. Indices past the computed block size indicate a corrupted range and
/// trip an assertion.
pub fn hash_block(mem: &dyn InstructionMemory, begin: u32, end: u32) -> BlockKey {
    let block_size = (((end - begin) + 4) / 4) as usize;
    let byte_size = block_size * 4;
    let mut scratch = [0u8; (MAX_BLOCK_SIZE + 4) as usize];

    let mut address = begin;
    while address <= end {
        let index = ((address - begin) / 4) as usize * 4;

        let opcode_lo = mem.get_instruction(address);
        let opcode_hi = mem.get_instruction(address + 4);

        debug_assert!(index + 8 <= byte_size);
        scratch[index..index + 4].copy_from_slice(&opcode_lo.to_le_bytes());
        scratch[index + 4..index + 8].copy_from_slice(&opcode_hi.to_le_bytes());

        address += 8;
    }

    BlockKey {
        hash: xxh3_128(&scratch[..byte_size]),
        length: end - begin,
    }
}
