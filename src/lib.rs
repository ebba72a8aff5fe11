//! memaccess - Memory access classification for SSA-based IRs.
//!
//! memaccess inspects single IR instructions and, when an instruction touches
//! memory, produces a normalized descriptor: the address, the number of bytes,
//! the alignment guarantee, whether it reads or writes, and whether it is
//! atomic. Instrumentation passes consume these descriptors instead of
//! pattern-matching loads, stores, bulk intrinsics and atomics themselves.
//!
//! # Primary Usage
//!
//! ```ignore
//! use memaccess::access::{MemRead, MemWrite};
//! use memaccess::test_ir::{TestIR, TestIRAdaptor};
//! use memaccess::core::IrAdaptor;
//!
//! let ir = TestIR::parse(source)?;
//! let adaptor = TestIRAdaptor::new(&ir);
//! for func in adaptor.funcs() {
//!     for inst in adaptor.func_insts(func) {
//!         if let Some(read) = MemRead::try_create(&adaptor, inst) {
//!             println!("read of {} bytes", read.const_length().unwrap_or(0));
//!         }
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - IR-agnostic types, data layout, adaptor traits and errors
//! - [`access`] - Memory access descriptors and the read/write classifiers
//! - [`pass`] - Module driver, no-instrument convention, access printer
//! - [`test_ir`] - Textual test IR with parser, printer and file checks
//! - `llvm` - LLVM adaptor (feature `llvm`)

pub mod access;
pub mod core;
#[cfg(feature = "llvm")]
pub mod llvm;
pub mod pass;
pub mod test_ir;

// Re-export common types
pub use access::{
    classify, collect, AccessLength, AccessRole, ConstInt, MemAccess, MemRead, MemWrite,
};
pub use crate::core::{DataLayout, InstKind, IrAdaptor, TargetLayout, Type};
pub use pass::{run_on_module, AccessPrinter, FunctionPass, PassReport};
