use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use vu::{BasicBlock, VuExecutor, VuState};

use crate::jit::TimingJit;
use crate::micro::{MicroMemory, VU0_MICRO_SIZE, VU1_MICRO_SIZE};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VuKind {
    Vu0,
    Vu1,
}

impl VuKind {
    pub fn micro_size(self) -> u32 {
        match self {
            VuKind::Vu0 => VU0_MICRO_SIZE,
            VuKind::Vu1 => VU1_MICRO_SIZE,
        }
    }
}

/// One vector unit: microprogram memory plus its block execution engine.
pub struct VectorUnit {
    mem: MicroMemory,
    executor: VuExecutor<TimingJit>,
    state: VuState,
}

impl VectorUnit {
    pub fn new(kind: VuKind) -> VectorUnit {
        let size = kind.micro_size();
        VectorUnit {
            mem: MicroMemory::new(size),
            executor: VuExecutor::new(size, TimingJit),
            state: VuState::default(),
        }
    }

    pub fn memory(&self) -> &MicroMemory {
        &self.mem
    }

    pub fn executor(&self) -> &VuExecutor<TimingJit> {
        &self.executor
    }

    pub fn state(&self) -> &VuState {
        &self.state
    }

    /// Load a new microprogram image. Every previously compiled block is
    /// dropped; invalidation is all-or-nothing.
    pub fn load_program(&mut self, offset: u32, image: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            image.len() as u32 <= self.mem.size(),
            "program image of {} bytes exceeds {} bytes of micro memory",
            image.len(),
            self.mem.size()
        );
        anyhow::ensure!(
            image.len() % 8 == 0,
            "program image must be a whole number of 8-byte instruction slots"
        );
        self.mem.load(offset, image);
        self.executor.reset();
        self.state = VuState::default();
        debug!(bytes = image.len(), offset, "microprogram loaded");
        Ok(())
    }

    /// Partition every block statically reachable from `entry` by following
    /// recorded block links, and return the blocks discovered by this call
    /// in address order.
    pub fn partition_reachable(&mut self, entry: u32) -> Vec<Rc<BasicBlock>> {
        let mask = self.mem.size() - 1;
        let mut worklist = VecDeque::new();
        worklist.push_back(entry & mask & !7);
        let mut discovered = Vec::new();

        while let Some(start) = worklist.pop_front() {
            if self.executor.directory().find_block_starting_at(start).is_some() {
                continue;
            }
            self.executor.partition_function(&self.mem, start);
            let block = Rc::clone(
                self.executor
                    .directory()
                    .find_block_starting_at(start)
                    .expect("partition registers a block"),
            );
            let links = self.executor.directory().links_for(start);
            for successor in [links.next, links.branch].into_iter().flatten() {
                worklist.push_back(successor & mask & !7);
            }
            discovered.push(block);
        }

        discovered.sort_by_key(|block| block.begin_address());
        discovered
    }

    /// Dispatch compiled blocks from `entry` until the program halts or the
    /// cycle budget runs out.
    pub fn run(&mut self, entry: u32, cycle_budget: u64) -> &VuState {
        let mask = self.mem.size() - 1;
        self.state.pc = entry & mask & !7;
        self.state.halted = false;

        while !self.state.halted && self.state.cycle < cycle_budget {
            let pc = self.state.pc & mask & !7;
            if self.executor.directory().find_block_starting_at(pc).is_none() {
                self.executor.partition_function(&self.mem, pc);
            }
            let block = Rc::clone(
                self.executor
                    .directory()
                    .find_block_starting_at(pc)
                    .expect("partition registers a block"),
            );
            block.execute(&mut self.state);
        }
        &self.state
    }

    pub fn reset(&mut self) {
        self.executor.reset();
        self.state = VuState::default();
    }
}
