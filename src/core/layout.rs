//! Target layout accessor.
//!
//! The classifiers never interpret types themselves; every size and natural
//! alignment goes through this trait, supplied by the surrounding IR.

/// Target facts needed to turn IR types into byte counts.
pub trait TargetLayout {
    type TypeRef: Copy;
    type ValueRef: Copy;

    /// Number of bytes written by a store of the given type.
    fn type_store_size(&self, ty: Self::TypeRef) -> u64;

    /// Bit width of the largest integer type the target handles natively.
    fn largest_legal_int_width(&self) -> u32;

    /// Alignment in bytes known for the memory a pointer value points to, 0 if unknown.
    fn pointer_alignment(&self, ptr: Self::ValueRef) -> u32;
}
