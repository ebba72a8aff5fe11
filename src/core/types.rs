// This module defines the IR-agnostic type model used by the data layout and the test IR.
// Type covers the first-class types that can flow through memory instructions: integers
// of arbitrary width, the IEEE float kinds, opaque pointers, fixed vectors, arrays and
// literal structs, plus void for call results. The Display implementation renders the
// LLVM spelling so printed IR and diagnostics read like the textual LLVM format.

//! First-class IR types.

use std::fmt;

/// A first-class IR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Integer of the given bit width (`i1`, `i8`, `i64`, `i128`, ...).
    Int(u32),
    Half,
    Float,
    Double,
    Fp128,
    /// Opaque pointer in the default address space.
    Ptr,
    Vector { len: u32, elem: Box<Type> },
    Array { len: u64, elem: Box<Type> },
    Struct(Vec<Type>),
}

impl Type {
    pub fn int(bits: u32) -> Self {
        Type::Int(bits)
    }

    pub fn vector(len: u32, elem: Type) -> Self {
        Type::Vector { len, elem: Box::new(elem) }
    }

    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array { len, elem: Box::new(elem) }
    }

    /// Whether values of this type occupy memory.
    pub fn is_sized(&self) -> bool {
        match self {
            Type::Void => false,
            Type::Vector { elem, .. } | Type::Array { elem, .. } => elem.is_sized(),
            Type::Struct(fields) => fields.iter().all(Type::is_sized),
            _ => true,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr)
    }

    /// Width of a floating point type in bits.
    pub fn float_bits(&self) -> Option<u32> {
        match self {
            Type::Half => Some(16),
            Type::Float => Some(32),
            Type::Double => Some(64),
            Type::Fp128 => Some(128),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Half => write!(f, "half"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Fp128 => write!(f, "fp128"),
            Type::Ptr => write!(f, "ptr"),
            Type::Vector { len, elem } => write!(f, "<{} x {}>", len, elem),
            Type::Array { len, elem } => write!(f, "[{} x {}]", len, elem),
            Type::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, " }}")
            }
        }
    }
}
