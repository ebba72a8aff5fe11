// This module adapts inkwell's view of an LLVM module to the IrAdaptor trait. Loads,
// stores, cmpxchg and atomicrmw map directly to their InstKind views. Bulk memory
// operations appear in LLVM as calls to the llvm.memcpy, llvm.memmove and llvm.memset
// intrinsic families; their alignments are the `align` attributes on the call site's
// pointer parameters. Type store sizes come from LLVM's own TargetData built from the
// module's data-layout string, while the largest legal integer width is read from the
// same string through DataLayout. Natural pointer alignment follows the definition of
// the pointer: an alloca's alignment, a global's alignment (or its preferred alignment
// when none is set), or the `align` attribute of a function parameter.

//! Inkwell-backed adaptor.

use std::marker::PhantomData;

use hashbrown::HashMap;
use inkwell::attributes::{Attribute, AttributeLoc};
use inkwell::module::Module;
use inkwell::targets::TargetData;
use inkwell::types::{AnyType, AnyTypeEnum};
use inkwell::values::{
    AsValueRef, BasicValue, BasicValueEnum, CallSiteValue, FunctionValue,
    InstructionOpcode, InstructionValue,
};
use inkwell::AtomicOrdering;
use llvm_sys::prelude::LLVMValueRef;

use crate::core::{
    AtomicCmpXchgInst, AtomicRmwInst, DataLayout, InstKind, IrAdaptor, LayoutError, LoadInst,
    MemSetInst, MemTransferInst, MemTransferKind, StoreInst, TargetLayout,
};

/// Target layout of an LLVM module.
pub struct LlvmLayout<'ctx> {
    target_data: TargetData,
    data_layout: DataLayout,
    /// Known alignment of globals and `align` parameters, keyed by value.
    pointer_aligns: HashMap<LLVMValueRef, u32>,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> LlvmLayout<'ctx> {
    fn new(module: &Module<'ctx>) -> Result<Self, LayoutError> {
        let spec = module.get_data_layout();
        let spec = spec.as_str().to_string_lossy();
        let data_layout = DataLayout::parse(&spec)?;
        let target_data = TargetData::create(&spec);

        let mut pointer_aligns = HashMap::new();
        for global in module.get_globals() {
            let align = match global.get_alignment() {
                0 => target_data.get_preferred_alignment_of_global(&global),
                align => align,
            };
            pointer_aligns.insert(global.as_value_ref(), align);
        }

        let align_kind = Attribute::get_named_enum_kind_id("align");
        for func in module.get_functions() {
            for (idx, param) in func.get_param_iter().enumerate() {
                if let Some(attr) = func.get_enum_attribute(AttributeLoc::Param(idx as u32), align_kind) {
                    pointer_aligns.insert(param.as_value_ref(), attr.get_enum_value() as u32);
                }
            }
        }

        log::debug!(
            "LLVM layout '{}': largest legal int i{}, {} pointers with known alignment",
            spec,
            data_layout.largest_legal_int_width(),
            pointer_aligns.len()
        );

        Ok(Self {
            target_data,
            data_layout,
            pointer_aligns,
            _marker: PhantomData,
        })
    }

    pub fn data_layout(&self) -> &DataLayout {
        &self.data_layout
    }
}

impl<'ctx> TargetLayout for LlvmLayout<'ctx> {
    type TypeRef = AnyTypeEnum<'ctx>;
    type ValueRef = BasicValueEnum<'ctx>;

    fn type_store_size(&self, ty: AnyTypeEnum<'ctx>) -> u64 {
        self.target_data.get_store_size(&ty)
    }

    fn largest_legal_int_width(&self) -> u32 {
        self.data_layout.largest_legal_int_width()
    }

    fn pointer_alignment(&self, ptr: BasicValueEnum<'ctx>) -> u32 {
        if let Some(inst) = ptr.as_instruction_value() {
            if inst.get_opcode() == InstructionOpcode::Alloca {
                return inst.get_alignment().unwrap_or(0);
            }
        }
        self.pointer_aligns
            .get(&ptr.as_value_ref())
            .copied()
            .unwrap_or(0)
    }
}

/// IrAdaptor over an inkwell module.
pub struct LlvmAdaptor<'ctx> {
    functions: Vec<FunctionValue<'ctx>>,
    function_names: Vec<String>,
    layout: LlvmLayout<'ctx>,
}

impl<'ctx> LlvmAdaptor<'ctx> {
    pub fn new(module: &Module<'ctx>) -> Result<Self, LayoutError> {
        let functions: Vec<_> = module.get_functions().collect();
        let function_names = functions
            .iter()
            .map(|f| f.get_name().to_string_lossy().into_owned())
            .collect();
        Ok(Self {
            functions,
            function_names,
            layout: LlvmLayout::new(module)?,
        })
    }

    fn operand(inst: InstructionValue<'ctx>, idx: u32) -> Option<BasicValueEnum<'ctx>> {
        inst.get_operand(idx).and_then(|op| op.left())
    }

    fn type_of(value: BasicValueEnum<'ctx>) -> AnyTypeEnum<'ctx> {
        value.get_type().as_any_type_enum()
    }

    fn is_atomic(inst: InstructionValue<'ctx>) -> bool {
        inst.get_atomic_ordering()
            .is_ok_and(|ordering| ordering != AtomicOrdering::NotAtomic)
    }

    fn param_align(call: CallSiteValue<'ctx>, idx: u32) -> u32 {
        let align_kind = Attribute::get_named_enum_kind_id("align");
        call.get_enum_attribute(AttributeLoc::Param(idx), align_kind)
            .map_or(0, |attr| attr.get_enum_value() as u32)
    }

    /// Map calls to the bulk memory intrinsics; `None` for every other call.
    fn intrinsic_kind(
        inst: InstructionValue<'ctx>,
    ) -> Option<InstKind<BasicValueEnum<'ctx>, AnyTypeEnum<'ctx>>> {
        let call = CallSiteValue::try_from(inst).ok()?;
        let callee = call.get_called_fn_value()?;
        let name = callee.get_name().to_str().ok()?;

        let dest = Self::operand(inst, 0)?;
        let second = Self::operand(inst, 1)?;
        let length = Self::operand(inst, 2)?;

        let transfer = |kind| {
            InstKind::MemTransfer(MemTransferInst {
                kind,
                dest,
                source: second,
                length,
                dest_align: Self::param_align(call, 0),
                source_align: Self::param_align(call, 1),
            })
        };

        if name.starts_with("llvm.memcpy") {
            Some(transfer(MemTransferKind::Copy))
        } else if name.starts_with("llvm.memmove") {
            Some(transfer(MemTransferKind::Move))
        } else if name.starts_with("llvm.memset") {
            Some(InstKind::MemSet(MemSetInst {
                dest,
                value: second,
                length,
                align: Self::param_align(call, 0),
            }))
        } else {
            None
        }
    }

    fn describe(
        &self,
        inst: InstructionValue<'ctx>,
    ) -> Option<InstKind<BasicValueEnum<'ctx>, AnyTypeEnum<'ctx>>> {
        let kind = match inst.get_opcode() {
            InstructionOpcode::Load => InstKind::Load(LoadInst {
                pointer: Self::operand(inst, 0)?,
                loaded_type: inst.get_type(),
                align: inst.get_alignment().unwrap_or(0),
                atomic: Self::is_atomic(inst),
                volatile: inst.get_volatile().unwrap_or(false),
            }),
            InstructionOpcode::Store => {
                let value = Self::operand(inst, 0)?;
                InstKind::Store(StoreInst {
                    pointer: Self::operand(inst, 1)?,
                    value,
                    value_type: Self::type_of(value),
                    align: inst.get_alignment().unwrap_or(0),
                    atomic: Self::is_atomic(inst),
                    volatile: inst.get_volatile().unwrap_or(false),
                })
            }
            InstructionOpcode::AtomicCmpXchg => {
                let compare = Self::operand(inst, 1)?;
                InstKind::AtomicCmpXchg(AtomicCmpXchgInst {
                    pointer: Self::operand(inst, 0)?,
                    compare,
                    new_value: Self::operand(inst, 2)?,
                    compare_type: Self::type_of(compare),
                    volatile: inst.get_volatile().unwrap_or(false),
                })
            }
            InstructionOpcode::AtomicRMW => {
                let value = Self::operand(inst, 1)?;
                InstKind::AtomicRmw(AtomicRmwInst {
                    pointer: Self::operand(inst, 0)?,
                    value,
                    value_type: Self::type_of(value),
                    volatile: inst.get_volatile().unwrap_or(false),
                })
            }
            InstructionOpcode::Call => return Self::intrinsic_kind(inst),
            _ => return None,
        };
        Some(kind)
    }
}

/// Name of an LLVM value without printing the whole instruction.
fn llvm_value_name(value: LLVMValueRef) -> String {
    let mut len = 0usize;
    // SAFETY: `value` comes from a live inkwell value; LLVM returns a pointer
    // to `len` bytes owned by the value.
    let bytes = unsafe {
        let ptr = llvm_sys::core::LLVMGetValueName2(value, &mut len);
        if ptr.is_null() {
            return String::new();
        }
        std::slice::from_raw_parts(ptr as *const u8, len)
    };
    String::from_utf8_lossy(bytes).into_owned()
}

impl<'ctx> IrAdaptor for LlvmAdaptor<'ctx> {
    type ValueRef = BasicValueEnum<'ctx>;
    type InstRef = InstructionValue<'ctx>;
    type FuncRef = FunctionValue<'ctx>;
    type TypeRef = AnyTypeEnum<'ctx>;
    type Layout = LlvmLayout<'ctx>;

    fn func_count(&self) -> u32 {
        self.functions.len() as u32
    }

    fn funcs(&self) -> Box<dyn Iterator<Item = Self::FuncRef> + '_> {
        Box::new(self.functions.iter().copied())
    }

    fn func_link_name(&self, func: Self::FuncRef) -> &str {
        self.functions
            .iter()
            .position(|&f| f == func)
            .map_or("", |pos| &self.function_names[pos])
    }

    fn func_is_declaration(&self, func: Self::FuncRef) -> bool {
        func.count_basic_blocks() == 0
    }

    fn func_insts(&self, func: Self::FuncRef) -> Box<dyn Iterator<Item = Self::InstRef> + '_> {
        Box::new(
            func.get_basic_blocks()
                .into_iter()
                .flat_map(|bb| bb.get_instructions()),
        )
    }

    fn inst_kind(&self, inst: Self::InstRef) -> InstKind<Self::ValueRef, Self::TypeRef> {
        self.describe(inst).unwrap_or(InstKind::Other)
    }

    fn layout(&self) -> &LlvmLayout<'ctx> {
        &self.layout
    }

    fn value_name(&self, val: Self::ValueRef) -> String {
        if let BasicValueEnum::IntValue(int) = val {
            if let Some(c) = int.get_zero_extended_constant() {
                return c.to_string();
            }
        }
        let name = llvm_value_name(val.as_value_ref());
        if name.is_empty() {
            "<value>".to_string()
        } else if is_global(val) {
            format!("@{}", name)
        } else {
            format!("%{}", name)
        }
    }

    fn inst_label(&self, inst: Self::InstRef) -> String {
        let opcode = format!("{:?}", inst.get_opcode()).to_lowercase();
        let name = llvm_value_name(inst.as_value_ref());
        if name.is_empty() {
            opcode
        } else {
            format!("{} %{}", opcode, name)
        }
    }
}

fn is_global(val: BasicValueEnum<'_>) -> bool {
    // SAFETY: querying the kind of a live value.
    unsafe { !llvm_sys::core::LLVMIsAGlobalValue(val.as_value_ref()).is_null() }
}
