//! Test utilities for adaptor-level testing.
//!
//! This module provides a minimal in-memory IR so the classifiers can be
//! tested independently of the textual test IR.

#[cfg(test)]
pub mod test {
    use crate::core::{InstKind, IrAdaptor, TargetLayout};
    use hashbrown::HashMap;

    /// Layout where a type handle *is* its store size in bytes.
    pub struct MockLayout {
        legal_bits: u32,
        pointer_aligns: HashMap<u32, u32>,
    }

    impl TargetLayout for MockLayout {
        type TypeRef = u64;
        type ValueRef = u32;

        fn type_store_size(&self, ty: u64) -> u64 {
            ty
        }

        fn largest_legal_int_width(&self) -> u32 {
            self.legal_bits
        }

        fn pointer_alignment(&self, ptr: u32) -> u32 {
            self.pointer_aligns.get(&ptr).copied().unwrap_or(0)
        }
    }

    /// Single-function IR made of a list of instruction kinds.
    ///
    /// Instruction `i` is the `i`-th entry; values are plain numbers.
    pub struct MockIr {
        insts: Vec<InstKind<u32, u64>>,
        layout: MockLayout,
    }

    impl MockIr {
        pub fn new(legal_bits: u32, insts: Vec<InstKind<u32, u64>>) -> Self {
            Self {
                insts,
                layout: MockLayout {
                    legal_bits,
                    pointer_aligns: HashMap::new(),
                },
            }
        }

        /// Record the natural alignment reported for a pointer value.
        pub fn with_pointer_alignment(mut self, ptr: u32, align: u32) -> Self {
            self.layout.pointer_aligns.insert(ptr, align);
            self
        }
    }

    impl IrAdaptor for MockIr {
        type ValueRef = u32;
        type InstRef = u32;
        type FuncRef = u32;
        type TypeRef = u64;
        type Layout = MockLayout;

        fn func_count(&self) -> u32 {
            1
        }

        fn funcs(&self) -> Box<dyn Iterator<Item = u32> + '_> {
            Box::new(std::iter::once(0))
        }

        fn func_link_name(&self, _func: u32) -> &str {
            "mock"
        }

        fn func_is_declaration(&self, _func: u32) -> bool {
            false
        }

        fn func_insts(&self, _func: u32) -> Box<dyn Iterator<Item = u32> + '_> {
            Box::new(0..self.insts.len() as u32)
        }

        fn inst_kind(&self, inst: u32) -> InstKind<u32, u64> {
            self.insts[inst as usize]
        }

        fn layout(&self) -> &MockLayout {
            &self.layout
        }
    }
}
