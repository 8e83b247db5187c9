//! Content-addressed block cache behavior, exercised through the public
//! executor API with an injected counting code generator.

use std::cell::Cell;
use std::rc::Rc;

use vu::instructions::{OP_B, VU_UPPEROP_BIT_E};
use vu::{CodeGen, CompiledFunction, InstructionMemory, VuExecutor, VuState};

struct TestMemory {
    words: Vec<u32>,
}

impl TestMemory {
    fn new(size: u32) -> TestMemory {
        assert!(size.is_power_of_two());
        TestMemory {
            words: vec![0; (size / 4) as usize],
        }
    }

    fn set_slot(&mut self, address: u32, lower: u32, upper: u32) {
        let index = (address / 4) as usize;
        self.words[index] = lower;
        self.words[index + 1] = upper;
    }
}

impl InstructionMemory for TestMemory {
    fn get_instruction(&self, address: u32) -> u32 {
        self.words[(address as usize / 4) & (self.words.len() - 1)]
    }
}

/// Counts compile invocations and emits a function whose observable effect
/// depends only on the block's content and span.
struct CountingJit {
    compiles: Rc<Cell<u64>>,
}

impl CodeGen for CountingJit {
    fn compile(&mut self, mem: &dyn InstructionMemory, begin: u32, end: u32) -> CompiledFunction {
        self.compiles.set(self.compiles.get() + 1);
        let mut sum = 0u64;
        let mut address = begin;
        while address <= end {
            sum = sum.wrapping_add(mem.get_instruction(address) as u64);
            address += 4;
        }
        let span = end - begin + 4;
        CompiledFunction::new(move |state| {
            state.cycle = state.cycle.wrapping_add(sum);
            state.pc = state.pc.wrapping_add(span);
        })
    }
}

fn executor(max_address: u32) -> (VuExecutor<CountingJit>, Rc<Cell<u64>>) {
    let compiles = Rc::new(Cell::new(0));
    let jit = CountingJit {
        compiles: Rc::clone(&compiles),
    };
    (VuExecutor::new(max_address, jit), compiles)
}

fn lower_op(op: u8, imm11: u16) -> u32 {
    ((op as u32) << 25) | (imm11 as u32 & 0x7ff)
}

#[test]
fn identical_content_at_two_addresses_compiles_once() {
    let mut mem = TestMemory::new(0x4000);
    for base in [0x100u32, 0x900] {
        mem.set_slot(base, lower_op(OP_B, 2), 0x1234_5678);
        mem.set_slot(base + 8, 0, 0);
    }

    let (mut executor, compiles) = executor(0x4000);
    let a = executor.obtain_block(&mem, 0x100, 0x10c);
    let b = executor.obtain_block(&mem, 0x900, 0x90c);

    assert_eq!(compiles.get(), 1);
    assert_eq!(executor.stats().blocks_compiled, 1);
    assert_eq!(executor.stats().blocks_cloned, 1);
    assert!(a.function().shares_translation_with(b.function()));

    // The clone carries the new address range
    assert_eq!(b.begin_address(), 0x900);
    assert_eq!(b.end_address(), 0x90c);

    // Semantically identical output from both blocks
    let mut state_a = VuState::default();
    let mut state_b = VuState::default();
    a.execute(&mut state_a);
    b.execute(&mut state_b);
    assert_eq!(state_a, state_b);
}

#[test]
fn nop_pair_blocks_share_one_compilation() {
    // [0x1000, 0x1008) and [0x2000, 0x2008): two all-zero 8-byte blocks
    let mem = TestMemory::new(0x4000);

    let (mut executor, compiles) = executor(0x4000);
    let first = executor.obtain_block(&mem, 0x1000, 0x1004);
    let second = executor.obtain_block(&mem, 0x2000, 0x2004);

    assert_eq!(compiles.get(), 1);
    assert!(first.function().shares_translation_with(second.function()));
}

#[test]
fn different_content_compiles_separately() {
    let mut mem = TestMemory::new(0x4000);
    mem.set_slot(0x100, 0, VU_UPPEROP_BIT_E);
    mem.set_slot(0x200, 0xdead_beef, VU_UPPEROP_BIT_E);

    let (mut executor, compiles) = executor(0x4000);
    executor.obtain_block(&mem, 0x100, 0x10c);
    executor.obtain_block(&mem, 0x200, 0x20c);

    assert_eq!(compiles.get(), 2);
    assert_eq!(executor.cached_block_count(), 2);
}

#[test]
fn same_address_range_twice_is_a_plain_hit() {
    let mut mem = TestMemory::new(0x4000);
    mem.set_slot(0x40, 0, VU_UPPEROP_BIT_E);

    let (mut executor, compiles) = executor(0x4000);
    let first = executor.obtain_block(&mem, 0x40, 0x4c);
    let second = executor.obtain_block(&mem, 0x40, 0x4c);

    assert_eq!(compiles.get(), 1);
    assert_eq!(executor.stats().cache_hits, 1);
    assert_eq!(executor.stats().blocks_cloned, 0);
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn partitioning_is_deterministic_for_a_fixed_image() {
    let mut mem = TestMemory::new(0x4000);
    mem.set_slot(0x108, lower_op(OP_B, 0x7f0), 0);

    let (mut executor, _) = executor(0x4000);
    executor.partition_function(&mem, 0x100);
    let first = Rc::clone(executor.directory().find_block_starting_at(0x100).unwrap());
    let links_first = executor.directory().links_for(0x100);

    executor.reset();
    executor.partition_function(&mem, 0x100);
    let second = Rc::clone(executor.directory().find_block_starting_at(0x100).unwrap());
    let links_second = executor.directory().links_for(0x100);

    // Fresh object, byte-identical behavior and metadata
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(first.begin_address(), second.begin_address());
    assert_eq!(first.end_address(), second.end_address());
    assert_eq!(links_first, links_second);

    let mut state_a = VuState::default();
    let mut state_b = VuState::default();
    first.execute(&mut state_a);
    second.execute(&mut state_b);
    assert_eq!(state_a, state_b);
}

#[test]
fn reset_forces_a_fresh_compilation() {
    let mut mem = TestMemory::new(0x4000);
    mem.set_slot(0x80, 0, VU_UPPEROP_BIT_E);

    let (mut executor, compiles) = executor(0x4000);
    executor.obtain_block(&mem, 0x80, 0x8c);
    assert_eq!(compiles.get(), 1);

    executor.reset();
    assert_eq!(executor.cached_block_count(), 0);

    executor.obtain_block(&mem, 0x80, 0x8c);
    assert_eq!(compiles.get(), 2);
}
