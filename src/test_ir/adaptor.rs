//! TestIR adaptor implementation for the memory access classifiers.
//!
//! This adaptor lets the classifiers and the pass driver run on TestIR, so
//! every instruction kind can be exercised from small text files.

use super::{Operation, TestIR, ValueKind};
use crate::core::{
    AtomicCmpXchgInst, AtomicRmwInst, DataLayout, InstKind, IrAdaptor, LoadInst, MemSetInst,
    MemTransferInst, StoreInst, TargetLayout, Type,
};

/// Type aliases for TestIR references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncRef(pub u32);

/// Target layout of a TestIR module, answering from its `target datalayout`.
pub struct TirLayout<'ir> {
    ir: &'ir TestIR,
}

impl<'ir> TirLayout<'ir> {
    pub fn data_layout(&self) -> &'ir DataLayout {
        &self.ir.data_layout
    }
}

impl<'ir> TargetLayout for TirLayout<'ir> {
    type TypeRef = &'ir Type;
    type ValueRef = ValueRef;

    fn type_store_size(&self, ty: &'ir Type) -> u64 {
        self.ir.data_layout.type_store_size(ty)
    }

    fn largest_legal_int_width(&self) -> u32 {
        self.ir.data_layout.largest_legal_int_width()
    }

    fn pointer_alignment(&self, ptr: ValueRef) -> u32 {
        let dl = &self.ir.data_layout;
        match &self.ir.values[ptr.0 as usize].kind {
            ValueKind::Inst(Operation::Alloca { allocated, align }) => {
                if *align != 0 {
                    *align
                } else {
                    dl.pref_type_alignment(allocated)
                }
            }
            ValueKind::Global { value_type, align } => {
                if *align != 0 {
                    *align
                } else if value_type.is_sized() {
                    dl.preferred_global_alignment(value_type)
                } else {
                    0
                }
            }
            ValueKind::Arg { align } => *align,
            _ => 0,
        }
    }
}

/// Adaptor that implements IrAdaptor for TestIR
pub struct TestIRAdaptor<'ir> {
    ir: &'ir TestIR,
    layout: TirLayout<'ir>,
}

impl<'ir> TestIRAdaptor<'ir> {
    pub fn new(ir: &'ir TestIR) -> Self {
        Self {
            ir,
            layout: TirLayout { ir },
        }
    }

    pub fn ir(&self) -> &'ir TestIR {
        self.ir
    }

    /// Look up a function by name.
    pub fn func_by_name(&self, name: &str) -> Option<FuncRef> {
        self.ir.function_index(name).map(FuncRef)
    }

    /// Look up a named local value (`%name`) of a function.
    pub fn local(&self, func: &str, name: &str) -> Option<ValueRef> {
        self.ir.local_value(func, name).map(ValueRef)
    }

    /// Look up a global (`@name`).
    pub fn global(&self, name: &str) -> Option<ValueRef> {
        self.ir.global_value(name).map(ValueRef)
    }

    /// The instruction defining a named local value.
    pub fn inst_named(&self, func: &str, name: &str) -> Option<InstRef> {
        let idx = self.ir.local_value(func, name)?;
        match self.ir.values[idx as usize].kind {
            ValueKind::Inst(_) => Some(InstRef(idx)),
            _ => None,
        }
    }

    fn operation(&self, inst: InstRef) -> Option<&'ir Operation> {
        match &self.ir.values[inst.0 as usize].kind {
            ValueKind::Inst(op) => Some(op),
            _ => None,
        }
    }
}

impl<'ir> IrAdaptor for TestIRAdaptor<'ir> {
    type ValueRef = ValueRef;
    type InstRef = InstRef;
    type FuncRef = FuncRef;
    type TypeRef = &'ir Type;
    type Layout = TirLayout<'ir>;

    fn func_count(&self) -> u32 {
        self.ir.functions.len() as u32
    }

    fn funcs(&self) -> Box<dyn Iterator<Item = FuncRef> + '_> {
        Box::new((0..self.ir.functions.len() as u32).map(FuncRef))
    }

    fn func_link_name(&self, func: FuncRef) -> &str {
        &self.ir.functions[func.0 as usize].name
    }

    fn func_is_declaration(&self, func: FuncRef) -> bool {
        self.ir.functions[func.0 as usize].declaration
    }

    fn func_insts(&self, func: FuncRef) -> Box<dyn Iterator<Item = InstRef> + '_> {
        let ir = self.ir;
        let f = &ir.functions[func.0 as usize];
        Box::new(
            (f.block_begin_idx..f.block_end_idx)
                .flat_map(move |b| ir.blocks[b as usize].insts.iter().copied())
                .map(InstRef),
        )
    }

    fn inst_kind(&self, inst: InstRef) -> InstKind<ValueRef, &'ir Type> {
        let Some(op) = self.operation(inst) else {
            return InstKind::Other;
        };
        match op {
            Operation::Load {
                ty,
                ptr,
                align,
                atomic,
                volatile,
                ..
            } => InstKind::Load(LoadInst {
                pointer: ValueRef(*ptr),
                loaded_type: ty,
                align: *align,
                atomic: *atomic,
                volatile: *volatile,
            }),
            Operation::Store {
                ty,
                value,
                ptr,
                align,
                atomic,
                volatile,
                ..
            } => InstKind::Store(StoreInst {
                pointer: ValueRef(*ptr),
                value: ValueRef(*value),
                value_type: ty,
                align: *align,
                atomic: *atomic,
                volatile: *volatile,
            }),
            Operation::MemTransfer {
                kind,
                dest,
                src,
                len,
                align,
                ..
            } => InstKind::MemTransfer(MemTransferInst {
                kind: *kind,
                dest: ValueRef(*dest),
                source: ValueRef(*src),
                length: ValueRef(*len),
                dest_align: *align,
                source_align: *align,
            }),
            Operation::MemSet {
                dest,
                value,
                len,
                align,
                ..
            } => InstKind::MemSet(MemSetInst {
                dest: ValueRef(*dest),
                value: ValueRef(*value),
                length: ValueRef(*len),
                align: *align,
            }),
            Operation::CmpXchg {
                ptr,
                ty,
                cmp,
                new,
                volatile,
                ..
            } => InstKind::AtomicCmpXchg(AtomicCmpXchgInst {
                pointer: ValueRef(*ptr),
                compare: ValueRef(*cmp),
                new_value: ValueRef(*new),
                compare_type: ty,
                volatile: *volatile,
            }),
            Operation::AtomicRmw {
                ptr,
                ty,
                value,
                volatile,
                ..
            } => InstKind::AtomicRmw(AtomicRmwInst {
                pointer: ValueRef(*ptr),
                value: ValueRef(*value),
                value_type: ty,
                volatile: *volatile,
            }),
            _ => InstKind::Other,
        }
    }

    fn layout(&self) -> &TirLayout<'ir> {
        &self.layout
    }

    fn value_name(&self, val: ValueRef) -> String {
        self.ir.operand_string(val.0)
    }

    fn inst_label(&self, inst: InstRef) -> String {
        let value = &self.ir.values[inst.0 as usize];
        let opcode = self.operation(inst).map_or("<value>", Operation::name);
        if value.name.is_empty() {
            opcode.to_string()
        } else {
            format!("{} %{}", opcode, value.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
target datalayout = "e-p:64:64-i64:64-n8:16:32:64"
@g = global i64
@h = global [2 x i8], align 32
@big = global [32 x i8]
@small = global [16 x i8]
define void @f(ptr %p, ptr align 16 %q, i64 %n) {
entry:
  %a = alloca i32
  %b = alloca i64, align 2
  %v = load i64, ptr %q, align 4
  memmove ptr %p, ptr %q, i64 %n, align 8
  %x = add i64 %v, 1
  ret
}
"#;

    #[test]
    fn test_pointer_alignment_sources() {
        let ir = TestIR::parse(MODULE).unwrap();
        let adaptor = TestIRAdaptor::new(&ir);
        let layout = adaptor.layout();

        assert_eq!(layout.pointer_alignment(adaptor.local("f", "a").unwrap()), 4);
        assert_eq!(layout.pointer_alignment(adaptor.local("f", "b").unwrap()), 2);
        assert_eq!(layout.pointer_alignment(adaptor.global("g").unwrap()), 8);
        assert_eq!(layout.pointer_alignment(adaptor.global("h").unwrap()), 32);
        // Globals wider than 128 bits default to 16-byte alignment.
        assert_eq!(layout.pointer_alignment(adaptor.global("big").unwrap()), 16);
        assert_eq!(layout.pointer_alignment(adaptor.global("small").unwrap()), 1);
        assert_eq!(layout.pointer_alignment(adaptor.local("f", "p").unwrap()), 0);
        assert_eq!(layout.pointer_alignment(adaptor.local("f", "q").unwrap()), 16);
        assert_eq!(layout.pointer_alignment(adaptor.local("f", "v").unwrap()), 0);
    }

    #[test]
    fn test_inst_kinds_and_labels() {
        let ir = TestIR::parse(MODULE).unwrap();
        let adaptor = TestIRAdaptor::new(&ir);
        let func = adaptor.func_by_name("f").unwrap();
        let insts: Vec<_> = adaptor.func_insts(func).collect();
        assert_eq!(insts.len(), 6);

        match adaptor.inst_kind(insts[2]) {
            InstKind::Load(load) => {
                assert_eq!(load.pointer, adaptor.local("f", "q").unwrap());
                assert_eq!(*load.loaded_type, Type::Int(64));
                assert_eq!(load.align, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
        match adaptor.inst_kind(insts[3]) {
            InstKind::MemTransfer(transfer) => {
                assert_eq!(transfer.length, adaptor.local("f", "n").unwrap());
                assert_eq!(transfer.dest_align, 8);
                assert_eq!(transfer.source_align, 8);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(adaptor.inst_kind(insts[4]), InstKind::Other));
        assert!(matches!(adaptor.inst_kind(insts[0]), InstKind::Other));

        assert_eq!(adaptor.inst_label(insts[2]), "load %v");
        assert_eq!(adaptor.inst_label(insts[3]), "memmove");
        assert_eq!(adaptor.value_name(adaptor.global("g").unwrap()), "@g");
        assert_eq!(adaptor.func_link_name(func), "f");
        assert!(!adaptor.func_is_declaration(func));
    }
}
