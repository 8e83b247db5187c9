use core::fmt;
use std::rc::Rc;

use crate::state::VuState;

/// Opaque executable artifact produced by a code generator.
///
/// The block layer stores, returns and clones these but never looks inside;
/// `clone` shares the underlying translation rather than duplicating it.
#[derive(Clone)]
pub struct CompiledFunction(Rc<dyn Fn(&mut VuState)>);

impl CompiledFunction {
    pub fn new(function: impl Fn(&mut VuState) + 'static) -> CompiledFunction {
        CompiledFunction(Rc::new(function))
    }

    pub fn execute(&self, state: &mut VuState) {
        (self.0)(state)
    }

    /// True when both handles share one translation.
    pub fn shares_translation_with(&self, other: &CompiledFunction) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledFunction({:p})", Rc::as_ptr(&self.0))
    }
}

/// One compiled range of microcode.
///
/// `begin` and `end` are the byte addresses of the first and last instruction
/// words, both multiples of 4; the block covers `end - begin + 4` bytes.
/// Blocks are owned by the executor's content cache and shared with the
/// address directory, so an entry only goes away on a full reset.
#[derive(Debug)]
pub struct BasicBlock {
    begin: u32,
    end: u32,
    linkable: bool,
    function: CompiledFunction,
}

impl BasicBlock {
    pub fn new(begin: u32, end: u32, linkable: bool, function: CompiledFunction) -> BasicBlock {
        BasicBlock {
            begin,
            end,
            linkable,
            function,
        }
    }

    /// New block over a different address range reusing this block's
    /// translation. Content-identical code shares linkability, so only the
    /// address metadata changes; nothing is recompiled.
    pub fn retarget(&self, begin: u32, end: u32) -> BasicBlock {
        BasicBlock {
            begin,
            end,
            linkable: self.linkable,
            function: self.function.clone(),
        }
    }

    pub fn begin_address(&self) -> u32 {
        self.begin
    }

    pub fn end_address(&self) -> u32 {
        self.end
    }

    /// Whether every exit of this block is statically known, permitting a
    /// direct link to its successors instead of a trip through dispatch.
    pub fn is_linkable(&self) -> bool {
        self.linkable
    }

    pub fn function(&self) -> &CompiledFunction {
        &self.function
    }

    pub fn execute(&self, state: &mut VuState) {
        self.function.execute(state)
    }
}
