use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::block::{BasicBlock, CompiledFunction};
use crate::directory::BlockDirectory;
use crate::hash::{self, BlockKey};
use crate::instructions::{self, BranchKind, VU_UPPEROP_BIT_E};

/// Upper bound on the byte span of one basic block. Guarantees forward
/// progress through microprograms that never hit a terminator.
pub const MAX_BLOCK_SIZE: u32 = 0x1000;

/// The block engine's only view of program memory.
pub trait InstructionMemory {
    /// Read the 32-bit instruction word at `address`. Must be side-effect
    /// free and deterministic for a fixed program image.
    fn get_instruction(&self, address: u32) -> u32;
}

/// Translates one block of microcode into an executable artifact.
///
/// Stands in for the real recompiler backend; the engine only requires that
/// the produced artifact is callable and cheap to clone.
pub trait CodeGen {
    fn compile(&mut self, mem: &dyn InstructionMemory, begin: u32, end: u32) -> CompiledFunction;
}

/// Running totals over the lifetime of the executor.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Blocks translated from scratch (content-cache misses)
    pub blocks_compiled: u64,
    /// Blocks cloned from a content-identical translation at another address
    pub blocks_cloned: u64,
    /// Lookups returning an existing block unchanged
    pub cache_hits: u64,
}

/// VU flavour of the execution engine: partitions microcode into basic
/// blocks and caches their translations by content, so identical code at
/// different addresses is compiled exactly once per cache lifetime.
pub struct VuExecutor<C: CodeGen> {
    directory: BlockDirectory,
    cached_blocks: HashMap<BlockKey, Rc<BasicBlock>>,
    codegen: C,
    stats: ExecutorStats,
}

impl<C: CodeGen> VuExecutor<C> {
    pub fn new(max_address: u32, codegen: C) -> VuExecutor<C> {
        VuExecutor {
            directory: BlockDirectory::new(max_address),
            cached_blocks: HashMap::new(),
            codegen,
            stats: ExecutorStats::default(),
        }
    }

    pub fn directory(&self) -> &BlockDirectory {
        &self.directory
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    pub fn cached_block_count(&self) -> usize {
        self.cached_blocks.len()
    }

    pub fn stats_line(&self) -> String {
        format!(
            "blocks_compiled={} blocks_cloned={} cache_hits={} cached_blocks={}",
            self.stats.blocks_compiled,
            self.stats.blocks_cloned,
            self.stats.cache_hits,
            self.cached_blocks.len(),
        )
    }

    /// Discover the basic block starting at `start_address`, register it, and
    /// record its successor links when its exit is statically known.
    ///
    /// The scan advances one 8-byte slot at a time. An upper op with the E
    /// bit ends the block `0xC` bytes further on (the branch delay slot still
    /// belongs to the block); so does a branching lower op. Without either,
    /// the block is cut at [`MAX_BLOCK_SIZE`].
    pub fn partition_function(&mut self, mem: &impl InstructionMemory, start_address: u32) {
        let mut end_address = start_address + MAX_BLOCK_SIZE - 4;
        let mut branch_address = None;

        let mut address = start_address;
        while address < end_address {
            let lower_op = mem.get_instruction(address);
            let upper_op = mem.get_instruction(address + 4);
            if upper_op & VU_UPPEROP_BIT_E != 0 {
                end_address = address + 0xc;
                break;
            }
            match instructions::branch_kind(lower_op) {
                BranchKind::Normal => {
                    branch_address = instructions::branch_target(address, lower_op);
                    end_address = address + 0xc;
                    break;
                }
                BranchKind::NoDelaySlot => {
                    // VU branches always carry a delay slot
                    unreachable!("no-delay-slot branch in VU microcode at {:#06x}", address);
                }
                BranchKind::None => {}
            }
            address += 8;
        }
        debug_assert!(end_address - start_address <= MAX_BLOCK_SIZE);

        self.create_block(mem, start_address, end_address);
        let linkable = self
            .directory
            .find_block_starting_at(start_address)
            .map(|block| block.is_linkable())
            .expect("created block must be registered");
        if linkable {
            self.directory
                .set_block_links(start_address, end_address, branch_address);
        }
    }

    /// Register the block spanning `begin..=end` unless one already starts
    /// at `begin`.
    fn create_block(&mut self, mem: &impl InstructionMemory, begin: u32, end: u32) {
        if self.directory.find_block_starting_at(begin).is_none() {
            let block = self.obtain_block(mem, begin, end);
            self.directory.add_block(block);
        }
    }

    /// Produce a ready block for `begin..=end`, compiling at most once per
    /// distinct content signature.
    ///
    /// A cache hit over the identical address range returns the cached block
    /// as-is. A hit from a different address range returns a fresh block that
    /// shares the cached translation, since only address metadata differs.
    pub fn obtain_block(&mut self, mem: &impl InstructionMemory, begin: u32, end: u32) -> Rc<BasicBlock> {
        debug_assert!(begin & 3 == 0 && end & 3 == 0);
        let key = hash::hash_block(mem, begin, end);

        if let Some(cached) = self.cached_blocks.get(&key) {
            if cached.begin_address() == begin && cached.end_address() == end {
                self.stats.cache_hits += 1;
                debug!(begin, end, "block cache hit");
                return Rc::clone(cached);
            }
            let block = Rc::new(cached.retarget(begin, end));
            self.stats.blocks_cloned += 1;
            debug!(
                begin,
                end,
                twin = cached.begin_address(),
                "block cloned from content twin"
            );
            return block;
        }

        let linkable = is_linkable(mem, begin, end);
        let function = self.codegen.compile(mem, begin, end);
        let block = Rc::new(BasicBlock::new(begin, end, linkable, function));
        self.cached_blocks.insert(key, Rc::clone(&block));
        self.stats.blocks_compiled += 1;
        debug!(begin, end, linkable, "block compiled");
        block
    }

    /// Drop every cached translation and directory entry. Invalidation is
    /// all-or-nothing; called when the loaded program image changes.
    pub fn reset(&mut self) {
        debug!(cached = self.cached_blocks.len(), "executor reset");
        self.cached_blocks.clear();
        self.directory.reset();
    }
}

/// A block can be linked straight to its successors when its exit is
/// statically known: it was cut at the size limit (pure fall-through) or it
/// ends in a branch with a computable target. E-bit terminators end the
/// microprogram and register-indirect jumps have no static target, so
/// neither is linkable.
fn is_linkable(mem: &impl InstructionMemory, begin: u32, end: u32) -> bool {
    if end - begin < 0xc {
        // Too short to hold a terminator and its delay slot
        return true;
    }
    let terminator = end - 0xc;
    let lower_op = mem.get_instruction(terminator);
    let upper_op = mem.get_instruction(terminator + 4);
    if upper_op & VU_UPPEROP_BIT_E != 0 {
        return false;
    }
    match instructions::branch_kind(lower_op) {
        BranchKind::Normal => instructions::branch_target(terminator, lower_op).is_some(),
        _ => true,
    }
}
