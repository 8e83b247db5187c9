use std::rc::Rc;

use crate::block::BasicBlock;

/// Successors recorded for a block whose exit is statically known.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BlockLinks {
    /// Fall-through successor (the slot after the delay slot)
    pub next: Option<u32>,
    /// Taken-branch successor, when the target is statically known
    pub branch: Option<u32>,
}

/// Start-address index over the blocks of the current program image.
///
/// This is the engine-generic dispatch layer: a flat table sized to the
/// address space, indexed by `begin / 4`. The VU executor adds and queries
/// entries; block ownership stays with its content cache, so entries here
/// only dangle after a full reset has cleared both.
pub struct BlockDirectory {
    blocks: Vec<Option<Rc<BasicBlock>>>,
    links: Vec<BlockLinks>,
    max_address: u32,
}

impl BlockDirectory {
    pub fn new(max_address: u32) -> BlockDirectory {
        assert!(max_address.is_power_of_two());
        let entries = (max_address / 4) as usize;
        BlockDirectory {
            blocks: vec![None; entries],
            links: vec![BlockLinks::default(); entries],
            max_address,
        }
    }

    fn index(&self, address: u32) -> usize {
        debug_assert!(address & 3 == 0);
        debug_assert!(address < self.max_address);
        (address / 4) as usize
    }

    pub fn find_block_starting_at(&self, address: u32) -> Option<&Rc<BasicBlock>> {
        self.blocks[self.index(address)].as_ref()
    }

    pub fn add_block(&mut self, block: Rc<BasicBlock>) {
        let index = self.index(block.begin_address());
        debug_assert!(self.blocks[index].is_none());
        self.blocks[index] = Some(block);
    }

    /// Record the successors of the block spanning `begin..=end`. The
    /// fall-through address wraps at the top of micro memory.
    pub fn set_block_links(&mut self, begin: u32, end: u32, branch_address: Option<u32>) {
        let index = self.index(begin);
        self.links[index] = BlockLinks {
            next: Some(end.wrapping_add(4) & (self.max_address - 1)),
            branch: branch_address,
        };
    }

    pub fn links_for(&self, begin: u32) -> BlockLinks {
        self.links[self.index(begin)]
    }

    pub fn max_address(&self) -> u32 {
        self.max_address
    }

    /// Drop every entry; part of the engine's all-or-nothing reset.
    pub fn reset(&mut self) {
        self.blocks.fill(None);
        self.links.fill(BlockLinks::default());
    }
}
