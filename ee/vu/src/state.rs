/// Execution state a compiled block runs against.
///
/// The block engine never interprets instruction semantics; this is the
/// entire context an opaque compiled artifact receives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VuState {
    /// Byte address of the next slot's lower op
    pub pc: u32,
    /// Instruction slots retired
    pub cycle: u64,
    /// Set once a block ends the microprogram (upper-op E bit)
    pub halted: bool,
}
