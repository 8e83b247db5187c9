use vu::instructions::{self, BranchKind, VU_UPPEROP_BIT_E};
use vu::{CodeGen, CompiledFunction, InstructionMemory};

/// Code generator that models only block timing and statically known control
/// flow. Actual microcode translation is a backend concern; this stand-in
/// keeps the engine runnable end to end.
///
/// Conditional branches are modeled as not taken, and register-indirect
/// jumps halt the unit since their target cannot be known statically.
pub struct TimingJit;

impl CodeGen for TimingJit {
    fn compile(&mut self, mem: &dyn InstructionMemory, begin: u32, end: u32) -> CompiledFunction {
        let slots = ((end - begin + 4) / 8) as u64;

        let mut ends_program = false;
        let mut indirect = false;
        if end - begin >= 0xc {
            let terminator = end - 0xc;
            let lower_op = mem.get_instruction(terminator);
            let upper_op = mem.get_instruction(terminator + 4);
            ends_program = upper_op & VU_UPPEROP_BIT_E != 0;
            indirect = !ends_program
                && instructions::branch_kind(lower_op) == BranchKind::Normal
                && instructions::branch_target(terminator, lower_op).is_none();
        }
        let fallthrough = end.wrapping_add(4);

        CompiledFunction::new(move |state| {
            state.cycle += slots;
            if ends_program || indirect {
                state.halted = true;
            } else {
                state.pc = fallthrough;
            }
        })
    }
}
