use modular_bitfield::{bitfield, specifiers::*};

/// Upper-op I bit: the lower slot holds an immediate instead of an instruction
pub const VU_UPPEROP_BIT_I: u32 = 0x8000_0000;
/// Upper-op E bit: the microprogram ends after the following slot
pub const VU_UPPEROP_BIT_E: u32 = 0x4000_0000;

// Lower-op opcode field values (bits 31:25) for the flow-control instructions
pub const OP_B: u8 = 0x20;
pub const OP_BAL: u8 = 0x21;
pub const OP_JR: u8 = 0x24;
pub const OP_JALR: u8 = 0x25;
pub const OP_IBEQ: u8 = 0x28;
pub const OP_IBNE: u8 = 0x29;
pub const OP_IBLTZ: u8 = 0x2c;
pub const OP_IBGTZ: u8 = 0x2d;
pub const OP_IBLEZ: u8 = 0x2e;
pub const OP_IBGEZ: u8 = 0x2f;

/// Field view of a lower op in the branch/jump format
#[bitfield(bits = 32)]
#[derive(Debug, Copy, Clone)]
pub struct LowerOp {
    pub imm11: B11,
    pub is: B5,
    pub it: B5,
    #[skip]
    __: B4,
    pub op: B7,
}

impl From<u32> for LowerOp {
    fn from(word: u32) -> LowerOp {
        LowerOp::from_bytes(word.to_ne_bytes())
    }
}

impl Into<u32> for LowerOp {
    fn into(self) -> u32 {
        u32::from_ne_bytes(self.into_bytes())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BranchKind {
    /// Not a branch
    None,
    /// Branch with the architectural single delay slot
    Normal,
    /// Branch without a delay slot; no VU instruction decodes to this
    NoDelaySlot,
}

/// Classify a lower op's effect on control flow.
pub fn branch_kind(opcode: u32) -> BranchKind {
    match LowerOp::from(opcode).op() {
        OP_B | OP_BAL | OP_JR | OP_JALR | OP_IBEQ | OP_IBNE | OP_IBLTZ | OP_IBGTZ | OP_IBLEZ
        | OP_IBGEZ => BranchKind::Normal,
        _ => BranchKind::None,
    }
}

/// Effective target of a branching lower op at `address`.
///
/// VU branch displacements count 8-byte instruction slots, taken from the
/// slot after the delay slot. Register-indirect jumps (JR/JALR) have no
/// statically known target.
pub fn branch_target(address: u32, opcode: u32) -> Option<u32> {
    let lower = LowerOp::from(opcode);
    match lower.op() {
        OP_B | OP_BAL | OP_IBEQ | OP_IBNE | OP_IBLTZ | OP_IBGTZ | OP_IBLEZ | OP_IBGEZ => {
            let displacement = sign_extend_imm11(lower.imm11());
            Some(
                address
                    .wrapping_add(8)
                    .wrapping_add((displacement << 3) as u32),
            )
        }
        _ => None,
    }
}

fn sign_extend_imm11(imm11: u16) -> i32 {
    ((imm11 as i32) << 21) >> 21
}
