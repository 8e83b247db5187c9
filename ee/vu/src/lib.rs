//! Block engine for the PS2 Vector Units (VU0/VU1).
//!
//! A VU executes 8-byte instruction slots: a lower (integer/flow-control) op
//! at `addr` and an upper (vector) op at `addr + 4`. This crate partitions a
//! microprogram into basic blocks, caches compiled translations by content
//! hash so that identical code appearing at different addresses compiles only
//! once, and records block-to-block links for direct re-entry.
//!
//! Instruction semantics and native code generation live behind the
//! [`CodeGen`] seam; the engine treats compiled artifacts as opaque.

pub mod block;
pub mod directory;
pub mod executor;
pub mod hash;
pub mod instructions;
pub mod state;

pub use block::{BasicBlock, CompiledFunction};
pub use directory::{BlockDirectory, BlockLinks};
pub use executor::{CodeGen, ExecutorStats, InstructionMemory, VuExecutor, MAX_BLOCK_SIZE};
pub use hash::BlockKey;
pub use state::VuState;
