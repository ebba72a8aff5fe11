// This module serves as the central hub for memaccess's core infrastructure, the pieces
// shared by every IR the classifiers run on. It exports the IR-agnostic type model, the
// target data layout parser with its size and alignment queries, the TargetLayout trait
// through which the classifiers reach those queries, the IrAdaptor trait that exposes an
// IR's functions and instructions, the closed set of instruction kind views, and the
// error types used by the parsing plumbing.

//! Core memaccess infrastructure
//!
//! # Key Components
//!
//! ## Types and Layout (`types`, `data_layout`, `layout`)
//! - First-class IR types with LLVM spelling
//! - LLVM-style data layout strings: sizes, alignments, legal integer widths
//! - The [`TargetLayout`] accessor consumed by the classifiers
//!
//! ## IR Access (`adaptor`, `inst`)
//! - [`IrAdaptor`] enumerates functions and instructions of any SSA IR
//! - [`InstKind`] describes an instruction as one of the memory kinds
//!
//! ## Errors (`error`)
//! - `thiserror` based errors for layout strings, test IR, and file checks

pub mod adaptor;
pub mod data_layout;
pub mod error;
pub mod inst;
pub mod layout;
pub mod test_utils;
pub mod types;

pub use adaptor::IrAdaptor;
pub use data_layout::{DataLayout, StructLayout};
pub use error::{CheckError, LayoutError, ParseError, ParseResult};
pub use inst::{
    AtomicCmpXchgInst, AtomicRmwInst, InstKind, LoadInst, MemIntrinsic, MemSetInst,
    MemTransferInst, MemTransferKind, StoreInst,
};
pub use layout::TargetLayout;
pub use types::Type;
