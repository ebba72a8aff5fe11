// This module defines the IrAdaptor trait, which serves as the bridge between memaccess
// and any SSA-based intermediate representation (IR). The trait provides a minimal
// read-only interface for the classifiers and the pass driver: enumerate functions,
// query their linkage names and whether they are declarations, iterate the instructions
// of a function, translate an instruction into the closed InstKind view, and reach the
// target layout. Naming hooks (value_name, inst_label) exist only for printing. Because
// every method takes &self, an adaptor that is Sync can be shared by worker threads that
// classify disjoint instructions concurrently.

//! IRAdaptor responsibilities.
//!
//! The adaptor is the glue between memaccess and the user's SSA based IR. The
//! framework assumes:
//! - Functions either have a body or are declarations.
//! - Each instruction can be described by exactly one [`InstKind`].
//! - Value, instruction, function and type handles are cheap to copy.
//!
//! Implementations are expected to be immutable while classification runs.

use super::inst::InstKind;
use super::layout::TargetLayout;

/// Bridge between an SSA IR and memaccess.
pub trait IrAdaptor {
    type ValueRef: Copy + Eq + core::fmt::Debug;
    type InstRef: Copy + Eq + core::fmt::Debug;
    type FuncRef: Copy + Eq + core::fmt::Debug;
    type TypeRef: Copy + core::fmt::Debug;
    type Layout: TargetLayout<TypeRef = Self::TypeRef, ValueRef = Self::ValueRef>;

    /// Number of functions contained in the module.
    fn func_count(&self) -> u32;

    /// Iterator over all functions in the module.
    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_>;

    /// Linkage name of the function.
    fn func_link_name(&self, func: Self::FuncRef) -> &str;

    /// Whether the function has no body in this module.
    fn func_is_declaration(&self, func: Self::FuncRef) -> bool;

    /// Iterator over all instructions of a function, in block order.
    fn func_insts(&self, func: Self::FuncRef) -> Box<dyn Iterator<Item = Self::InstRef> + '_>;

    /// Describe the instruction as one of the kinds the classifiers know.
    fn inst_kind(&self, inst: Self::InstRef) -> InstKind<Self::ValueRef, Self::TypeRef>;

    /// Target layout of the module.
    fn layout(&self) -> &Self::Layout;

    /// Printable name of a value (for printing).
    fn value_name(&self, _val: Self::ValueRef) -> String {
        String::from("<value>")
    }

    /// Printable label of an instruction (for printing).
    fn inst_label(&self, _inst: Self::InstRef) -> String {
        String::from("<inst>")
    }
}
