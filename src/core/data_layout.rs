// This module implements the target data layout used to interpret IR types concretely.
// DataLayout parses LLVM-style layout strings ("e-p:64:64-i64:64-n8:16:32:64-S128") into
// pointer, integer, float, vector and aggregate alignment tables plus the list of native
// integer widths. On top of those tables it answers the questions memory access
// classification needs: the size of a type in bits, its store size (bytes written by a
// load or store), its allocation size, its ABI and preferred alignments, and the largest
// legal integer width used to materialize constant byte counts. Defaults mirror LLVM's
// built-in layout so an IR file without a `target datalayout` line behaves like LLVM.

//! Target data layout.

use super::error::LayoutError;
use super::types::Type;

/// Alignment table entry. Widths are in bits, alignments in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlignEntry {
    bits: u32,
    abi: u32,
    pref: u32,
}

/// Parsed target data layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    spec: String,
    big_endian: bool,
    pointer_bits: u32,
    pointer_abi: u32,
    pointer_pref: u32,
    int_aligns: Vec<AlignEntry>,
    float_aligns: Vec<AlignEntry>,
    vector_aligns: Vec<AlignEntry>,
    aggregate_abi: u32,
    aggregate_pref: u32,
    legal_int_widths: Vec<u32>,
    stack_align: u32,
}

impl Default for DataLayout {
    fn default() -> Self {
        let entry = |bits, abi, pref| AlignEntry { bits, abi, pref };
        Self {
            spec: String::new(),
            big_endian: false,
            pointer_bits: 64,
            pointer_abi: 8,
            pointer_pref: 8,
            int_aligns: vec![
                entry(1, 1, 1),
                entry(8, 1, 1),
                entry(16, 2, 2),
                entry(32, 4, 4),
                entry(64, 4, 8),
            ],
            float_aligns: vec![
                entry(16, 2, 2),
                entry(32, 4, 4),
                entry(64, 8, 8),
                entry(128, 16, 16),
            ],
            vector_aligns: vec![entry(64, 8, 8), entry(128, 16, 16)],
            aggregate_abi: 1,
            aggregate_pref: 8,
            legal_int_widths: Vec::new(),
            stack_align: 0,
        }
    }
}

impl DataLayout {
    /// Parse an LLVM data layout string. The empty string yields the default layout.
    pub fn parse(spec: &str) -> Result<Self, LayoutError> {
        let mut layout = DataLayout {
            spec: spec.to_string(),
            ..DataLayout::default()
        };

        for token in spec.split('-').filter(|t| !t.is_empty()) {
            layout.parse_token(token)?;
        }

        log::debug!(
            "Parsed data layout '{}': ptr={} bits, legal ints={:?}",
            spec,
            layout.pointer_bits,
            layout.legal_int_widths
        );
        Ok(layout)
    }

    fn parse_token(&mut self, token: &str) -> Result<(), LayoutError> {
        if !token.is_char_boundary(1) {
            return Err(LayoutError::UnknownSpecifier {
                token: token.to_string(),
            });
        }
        let (head, rest) = token.split_at(1);
        match head {
            // Non-integral address spaces do not affect sizes.
            _ if token.starts_with("ni:") => {}
            "e" if rest.is_empty() => self.big_endian = false,
            "E" if rest.is_empty() => self.big_endian = true,
            "p" => {
                let (addr_space, fields) = split_prefix(token, rest)?;
                if fields.len() < 2 {
                    return Err(invalid(token, "pointer spec needs size and ABI alignment"));
                }
                let bits = parse_bits(token, fields[0])?;
                if bits == 0 {
                    return Err(invalid(token, "pointer size must be non-zero"));
                }
                let abi = parse_align(token, fields[1], false)?;
                let pref = match fields.get(2) {
                    Some(field) => parse_align(token, field, false)?,
                    None => abi,
                };
                // Only the default address space matters for opaque `ptr`.
                if addr_space.unwrap_or(0) == 0 {
                    self.pointer_bits = bits;
                    self.pointer_abi = abi;
                    self.pointer_pref = pref;
                }
            }
            "i" | "f" | "v" => {
                let (bits, fields) = split_prefix(token, rest)?;
                let bits = bits.ok_or_else(|| invalid(token, "missing type width"))?;
                if fields.is_empty() {
                    return Err(invalid(token, "missing ABI alignment"));
                }
                let abi = parse_align(token, fields[0], false)?;
                let pref = match fields.get(1) {
                    Some(field) => parse_align(token, field, false)?,
                    None => abi,
                };
                let table = match head {
                    "i" => &mut self.int_aligns,
                    "f" => &mut self.float_aligns,
                    _ => &mut self.vector_aligns,
                };
                set_entry(table, AlignEntry { bits, abi, pref });
            }
            "a" => {
                let (_, fields) = split_prefix(token, rest)?;
                if fields.is_empty() {
                    return Err(invalid(token, "missing ABI alignment"));
                }
                self.aggregate_abi = parse_align(token, fields[0], true)?.max(1);
                if let Some(field) = fields.get(1) {
                    self.aggregate_pref = parse_align(token, field, true)?.max(1);
                }
            }
            "n" => {
                let mut widths = Vec::new();
                for field in rest.split(':') {
                    let bits = parse_bits(token, field)?;
                    if bits == 0 {
                        return Err(invalid(token, "native integer width must be non-zero"));
                    }
                    widths.push(bits);
                }
                self.legal_int_widths = widths;
            }
            "S" => {
                self.stack_align = parse_align(token, rest, true)?;
            }
            // Mangling, address spaces and function pointer alignment.
            "m" | "A" | "P" | "G" | "F" => {}
            _ => {
                return Err(LayoutError::UnknownSpecifier {
                    token: token.to_string(),
                })
            }
        }
        Ok(())
    }

    /// The layout string this layout was parsed from (empty for the default).
    pub fn as_str(&self) -> &str {
        &self.spec
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn pointer_size_bits(&self) -> u32 {
        self.pointer_bits
    }

    /// Native integer widths declared with the `n` specifier.
    pub fn legal_int_widths(&self) -> &[u32] {
        &self.legal_int_widths
    }

    pub fn is_legal_integer(&self, bits: u32) -> bool {
        self.legal_int_widths.contains(&bits)
    }

    /// Width of the largest native integer type.
    ///
    /// Falls back to the pointer width when the layout declares no native
    /// integers, so constant sizes can always be materialized.
    pub fn largest_legal_int_width(&self) -> u32 {
        self.legal_int_widths
            .iter()
            .copied()
            .max()
            .unwrap_or(self.pointer_bits)
    }

    /// Natural stack alignment in bytes, 0 when unspecified.
    pub fn stack_alignment(&self) -> u32 {
        self.stack_align
    }

    /// Size of the type in bits, without any padding.
    ///
    /// Saturates at `u64::MAX` for types too large to address; see
    /// [`DataLayout::checked_type_size_in_bits`].
    pub fn type_size_in_bits(&self, ty: &Type) -> u64 {
        self.checked_type_size_in_bits(ty).unwrap_or(u64::MAX)
    }

    /// Size of the type in bits, or `None` if it overflows a `u64`.
    pub fn checked_type_size_in_bits(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Void => Some(0),
            Type::Int(bits) => Some(u64::from(*bits)),
            Type::Ptr => Some(u64::from(self.pointer_bits)),
            Type::Vector { len, elem } => {
                u64::from(*len).checked_mul(self.checked_type_size_in_bits(elem)?)
            }
            Type::Array { len, elem } => len
                .checked_mul(self.checked_type_alloc_size(elem)?)?
                .checked_mul(8),
            Type::Struct(fields) => self.struct_layout(fields)?.size.checked_mul(8),
            _ => Some(u64::from(ty.float_bits().unwrap_or(0))),
        }
    }

    /// Maximum number of bytes written when storing a value of this type.
    pub fn type_store_size(&self, ty: &Type) -> u64 {
        self.checked_type_store_size(ty).unwrap_or(u64::MAX)
    }

    pub fn checked_type_store_size(&self, ty: &Type) -> Option<u64> {
        Some(self.checked_type_size_in_bits(ty)?.div_ceil(8))
    }

    /// Offset in bytes between successive objects of this type, including padding.
    pub fn type_alloc_size(&self, ty: &Type) -> u64 {
        self.checked_type_alloc_size(ty).unwrap_or(u64::MAX)
    }

    /// Allocation size, or `None` if the type is too large to place in memory.
    pub fn checked_type_alloc_size(&self, ty: &Type) -> Option<u64> {
        align_to(
            self.checked_type_store_size(ty)?,
            u64::from(self.abi_type_alignment(ty)),
        )
    }

    /// Minimum ABI-required alignment of the type in bytes.
    pub fn abi_type_alignment(&self, ty: &Type) -> u32 {
        self.type_alignment(ty, true)
    }

    /// Preferred alignment of the type in bytes.
    pub fn pref_type_alignment(&self, ty: &Type) -> u32 {
        self.type_alignment(ty, false)
    }

    /// Alignment of a global variable of this type that has no explicit `align`.
    ///
    /// Globals wider than 128 bits are raised to at least 16 bytes.
    pub fn preferred_global_alignment(&self, ty: &Type) -> u32 {
        let align = self.pref_type_alignment(ty);
        if align < 16 && self.type_size_in_bits(ty) > 128 {
            16
        } else {
            align
        }
    }

    fn type_alignment(&self, ty: &Type, abi: bool) -> u32 {
        let pick = |entry: AlignEntry| if abi { entry.abi } else { entry.pref };
        match ty {
            Type::Void => 1,
            Type::Ptr => {
                if abi {
                    self.pointer_abi
                } else {
                    self.pointer_pref
                }
            }
            Type::Int(bits) => pick(lookup_int(&self.int_aligns, *bits)),
            Type::Vector { .. } => {
                let bits = self.type_size_in_bits(ty);
                match self.vector_aligns.iter().find(|e| u64::from(e.bits) == bits) {
                    Some(entry) => pick(*entry),
                    None => natural_alignment(self.type_store_size(ty)),
                }
            }
            Type::Array { elem, .. } => self.type_alignment(elem, abi),
            Type::Struct(fields) => {
                let aggregate = if abi {
                    self.aggregate_abi
                } else {
                    self.aggregate_pref
                };
                let fields_align = fields
                    .iter()
                    .map(|field| self.abi_type_alignment(field))
                    .max()
                    .unwrap_or(1);
                aggregate.max(fields_align)
            }
            _ => {
                let bits = ty.float_bits().unwrap_or(0);
                match self.float_aligns.iter().find(|e| e.bits == bits) {
                    Some(entry) => pick(*entry),
                    None => natural_alignment(self.type_store_size(ty)),
                }
            }
        }
    }

    /// Byte offsets of each field, total size and alignment of a literal struct.
    ///
    /// `None` when the struct is too large to address.
    pub fn struct_layout(&self, fields: &[Type]) -> Option<StructLayout> {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut offset = 0u64;
        let mut align = 1u32;
        for field in fields {
            let field_align = self.abi_type_alignment(field);
            offset = align_to(offset, u64::from(field_align))?;
            offsets.push(offset);
            offset = offset.checked_add(self.checked_type_alloc_size(field)?)?;
            align = align.max(field_align);
        }
        Some(StructLayout {
            offsets,
            size: align_to(offset, u64::from(align))?,
            align,
        })
    }
}

/// Field placement of a struct under a [`DataLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub offsets: Vec<u64>,
    pub size: u64,
    pub align: u32,
}

fn invalid(token: &str, reason: &str) -> LayoutError {
    LayoutError::InvalidToken {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Split `<number>?:<field>:<field>...` into the optional leading number and the fields.
fn split_prefix<'a>(token: &str, rest: &'a str) -> Result<(Option<u32>, Vec<&'a str>), LayoutError> {
    let mut parts = rest.split(':');
    let lead = parts.next().unwrap_or("");
    let lead = if lead.is_empty() {
        None
    } else {
        Some(parse_bits(token, lead)?)
    };
    Ok((lead, parts.collect()))
}

fn parse_bits(token: &str, field: &str) -> Result<u32, LayoutError> {
    field
        .parse::<u32>()
        .map_err(|_| invalid(token, &format!("'{}' is not a number", field)))
}

/// Parse an alignment given in bits and return it in bytes.
fn parse_align(token: &str, field: &str, allow_zero: bool) -> Result<u32, LayoutError> {
    let bits = parse_bits(token, field)?;
    if bits == 0 {
        if allow_zero {
            return Ok(0);
        }
        return Err(invalid(token, "alignment must be non-zero"));
    }
    if bits % 8 != 0 || !(bits / 8).is_power_of_two() {
        return Err(invalid(
            token,
            "alignment must be a power of two number of bytes",
        ));
    }
    Ok(bits / 8)
}

fn set_entry(table: &mut Vec<AlignEntry>, entry: AlignEntry) {
    match table.iter_mut().find(|e| e.bits == entry.bits) {
        Some(existing) => *existing = entry,
        None => {
            table.push(entry);
            table.sort_by_key(|e| e.bits);
        }
    }
}

/// Exact match, else the next wider integer, else the widest known integer.
fn lookup_int(table: &[AlignEntry], bits: u32) -> AlignEntry {
    table
        .iter()
        .find(|e| e.bits >= bits)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(AlignEntry { bits, abi: 1, pref: 1 })
}

fn natural_alignment(size: u64) -> u32 {
    const MAX_ALIGN: u64 = 1 << 31;
    size.max(1)
        .checked_next_power_of_two()
        .map_or(MAX_ALIGN, |align| align.min(MAX_ALIGN)) as u32
}

fn align_to(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        Some(value.checked_add(align - 1)? / align * align)
    }
}
