//! Machine layer around the VU block engine: microprogram memory images, a
//! placeholder code generator and the wiring that drives partitioning and
//! dispatch.

pub mod jit;
pub mod micro;
pub mod vector_unit;

pub use jit::TimingJit;
pub use micro::{MicroMemory, VU0_MICRO_SIZE, VU1_MICRO_SIZE};
pub use vector_unit::{VectorUnit, VuKind};
