//! Test IR (TIR) parser and data structures for testing memory access classification.
//!
//! This module provides a small LLVM-flavoured IR for writing classifier tests
//! without depending on an LLVM installation. The format is designed to be:
//! - Human-readable and writable
//! - Easy to parse
//! - Close enough to LLVM that every memory instruction kind is expressible
//!
//! # TIR Format
//!
//! ```text
//! ; Comments start with semicolon
//! target datalayout = "e-p:64:64-i64:64-n8:16:32:64"
//! @counter = global i64, align 8
//! declare void @log(ptr, i64)
//!
//! define void @copy(ptr %dst, ptr align 16 %src, i64 %n) {
//! entry:
//!   %v = load i64, ptr %src, align 4
//!   store i64 %v, ptr %dst
//!   memcpy ptr %dst, ptr %src, i64 %n, align 1
//!   %old = cmpxchg ptr @counter, i64 0, i64 1 seq_cst seq_cst
//!   %prev = atomicrmw add ptr @counter, i64 1 monotonic
//!   call @log(ptr %dst, i64 %n)
//!   ret
//! }
//! ```

use std::fmt;

use crate::core::{DataLayout, MemTransferKind, ParseResult, Type};

pub mod adaptor;
pub mod check;
pub mod parser;

pub use adaptor::{FuncRef, InstRef, TestIRAdaptor, TirLayout, ValueRef};
pub use check::{CheckDirective, TestRunner, TestSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct TestIR {
    pub data_layout: DataLayout,
    pub functions: Vec<Function>,
    pub blocks: Vec<Block>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub declaration: bool,
    pub ret_type: Type,
    pub params: Vec<Type>,
    /// Argument values (definitions only).
    pub args: Vec<u32>,
    pub block_begin_idx: u32,
    pub block_end_idx: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    /// Indices into `values` of the block's instructions.
    pub insts: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Empty for constants and unnamed instructions.
    pub name: String,
    pub ty: Type,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Global { value_type: Type, align: u32 },
    Arg { align: u32 },
    ConstInt(u64),
    Null,
    Inst(Operation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicOrdering {
    Unordered,
    Monotonic,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

impl AtomicOrdering {
    pub fn name(self) -> &'static str {
        match self {
            AtomicOrdering::Unordered => "unordered",
            AtomicOrdering::Monotonic => "monotonic",
            AtomicOrdering::Acquire => "acquire",
            AtomicOrdering::Release => "release",
            AtomicOrdering::AcqRel => "acq_rel",
            AtomicOrdering::SeqCst => "seq_cst",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unordered" => Some(AtomicOrdering::Unordered),
            "monotonic" => Some(AtomicOrdering::Monotonic),
            "acquire" => Some(AtomicOrdering::Acquire),
            "release" => Some(AtomicOrdering::Release),
            "acq_rel" => Some(AtomicOrdering::AcqRel),
            "seq_cst" => Some(AtomicOrdering::SeqCst),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RmwOp {
    Xchg,
    Add,
    Sub,
    And,
    Nand,
    Or,
    Xor,
    Max,
    Min,
    UMax,
    UMin,
    FAdd,
    FSub,
}

impl RmwOp {
    pub fn name(self) -> &'static str {
        use RmwOp::*;
        match self {
            Xchg => "xchg",
            Add => "add",
            Sub => "sub",
            And => "and",
            Nand => "nand",
            Or => "or",
            Xor => "xor",
            Max => "max",
            Min => "min",
            UMax => "umax",
            UMin => "umin",
            FAdd => "fadd",
            FSub => "fsub",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        use RmwOp::*;
        let op = match s {
            "xchg" => Xchg,
            "add" => Add,
            "sub" => Sub,
            "and" => And,
            "nand" => Nand,
            "or" => Or,
            "xor" => Xor,
            "max" => Max,
            "min" => Min,
            "umax" => UMax,
            "umin" => UMin,
            "fadd" => FAdd,
            "fsub" => FSub,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

impl BinOp {
    pub fn name(self) -> &'static str {
        use BinOp::*;
        match self {
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            UDiv => "udiv",
            SDiv => "sdiv",
            URem => "urem",
            SRem => "srem",
            And => "and",
            Or => "or",
            Xor => "xor",
            Shl => "shl",
            LShr => "lshr",
            AShr => "ashr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        use BinOp::*;
        let op = match s {
            "add" => Add,
            "sub" => Sub,
            "mul" => Mul,
            "udiv" => UDiv,
            "sdiv" => SDiv,
            "urem" => URem,
            "srem" => SRem,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "shl" => Shl,
            "lshr" => LShr,
            "ashr" => AShr,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl IntPredicate {
    pub fn name(self) -> &'static str {
        use IntPredicate::*;
        match self {
            Eq => "eq",
            Ne => "ne",
            Ugt => "ugt",
            Uge => "uge",
            Ult => "ult",
            Ule => "ule",
            Sgt => "sgt",
            Sge => "sge",
            Slt => "slt",
            Sle => "sle",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        use IntPredicate::*;
        let pred = match s {
            "eq" => Eq,
            "ne" => Ne,
            "ugt" => Ugt,
            "uge" => Uge,
            "ult" => Ult,
            "ule" => Ule,
            "sgt" => Sgt,
            "sge" => Sge,
            "slt" => Slt,
            "sle" => Sle,
            _ => return None,
        };
        Some(pred)
    }
}

/// A TIR instruction. Operands are indices into [`TestIR::values`], block
/// targets are indices into [`TestIR::blocks`], callees into [`TestIR::functions`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Alloca {
        allocated: Type,
        align: u32,
    },
    Load {
        ty: Type,
        ptr: u32,
        align: u32,
        ordering: Option<AtomicOrdering>,
        atomic: bool,
        volatile: bool,
    },
    Store {
        ty: Type,
        value: u32,
        ptr: u32,
        align: u32,
        ordering: Option<AtomicOrdering>,
        atomic: bool,
        volatile: bool,
    },
    MemTransfer {
        kind: MemTransferKind,
        dest: u32,
        src: u32,
        len_ty: Type,
        len: u32,
        align: u32,
    },
    MemSet {
        dest: u32,
        value: u32,
        len_ty: Type,
        len: u32,
        align: u32,
    },
    CmpXchg {
        ptr: u32,
        ty: Type,
        cmp: u32,
        new: u32,
        success: Option<AtomicOrdering>,
        failure: Option<AtomicOrdering>,
        volatile: bool,
    },
    AtomicRmw {
        op: RmwOp,
        ptr: u32,
        ty: Type,
        value: u32,
        ordering: Option<AtomicOrdering>,
        volatile: bool,
    },
    Binary {
        op: BinOp,
        ty: Type,
        lhs: u32,
        rhs: u32,
    },
    ICmp {
        pred: IntPredicate,
        ty: Type,
        lhs: u32,
        rhs: u32,
    },
    Call {
        callee: u32,
        ret_type: Type,
        args: Vec<(Type, u32)>,
    },
    Br {
        target: u32,
    },
    CondBr {
        cond: u32,
        then_block: u32,
        else_block: u32,
    },
    Ret {
        value: Option<(Type, u32)>,
    },
    Unreachable,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Alloca { .. } => "alloca",
            Operation::Load { .. } => "load",
            Operation::Store { .. } => "store",
            Operation::MemTransfer { kind, .. } => kind.name(),
            Operation::MemSet { .. } => "memset",
            Operation::CmpXchg { .. } => "cmpxchg",
            Operation::AtomicRmw { .. } => "atomicrmw",
            Operation::Binary { op, .. } => op.name(),
            Operation::ICmp { .. } => "icmp",
            Operation::Call { .. } => "call",
            Operation::Br { .. } => "br",
            Operation::CondBr { .. } => "condbr",
            Operation::Ret { .. } => "ret",
            Operation::Unreachable => "unreachable",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Operation::Br { .. }
                | Operation::CondBr { .. }
                | Operation::Ret { .. }
                | Operation::Unreachable
        )
    }
}

impl TestIR {
    pub fn new() -> Self {
        Self {
            data_layout: DataLayout::default(),
            functions: Vec::new(),
            blocks: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> ParseResult<Self> {
        parser::parse_ir(text)
    }

    /// Index of the function with the given name.
    pub fn function_index(&self, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|idx| idx as u32)
    }

    /// Index of the named local value (`%name`) defined in a function.
    pub fn local_value(&self, func: &str, name: &str) -> Option<u32> {
        let func = &self.functions[self.function_index(func)? as usize];
        let insts = (func.block_begin_idx..func.block_end_idx)
            .flat_map(|b| self.blocks[b as usize].insts.iter().copied());
        func.args
            .iter()
            .copied()
            .chain(insts)
            .find(|&idx| self.values[idx as usize].name == name)
    }

    /// Index of the named global (`@name`).
    pub fn global_value(&self, name: &str) -> Option<u32> {
        self.values
            .iter()
            .position(|v| v.name == name && matches!(v.kind, ValueKind::Global { .. }))
            .map(|idx| idx as u32)
    }

    /// Text of a value used as an operand: `%local`, `@global`, or a constant.
    pub fn operand_string(&self, idx: u32) -> String {
        let value = &self.values[idx as usize];
        match &value.kind {
            ValueKind::Global { .. } => format!("@{}", value.name),
            ValueKind::ConstInt(c) => c.to_string(),
            ValueKind::Null => "null".to_string(),
            ValueKind::Arg { .. } | ValueKind::Inst(_) => format!("%{}", value.name),
        }
    }

    pub fn print(&self) -> String {
        self.to_string()
    }

    fn write_inst(&self, f: &mut fmt::Formatter<'_>, idx: u32) -> fmt::Result {
        let value = &self.values[idx as usize];
        let ValueKind::Inst(op) = &value.kind else {
            return Ok(());
        };
        let opnd = |i: u32| self.operand_string(i);
        let block = |b: u32| format!("^{}", self.blocks[b as usize].name);
        let align = |a: u32| {
            if a == 0 {
                String::new()
            } else {
                format!(", align {}", a)
            }
        };
        let ordering = |o: Option<AtomicOrdering>| match o {
            Some(o) => format!(" {}", o.name()),
            None => String::new(),
        };
        let flags = |atomic: bool, volatile: bool| {
            let mut s = String::new();
            if atomic {
                s.push_str("atomic ");
            }
            if volatile {
                s.push_str("volatile ");
            }
            s
        };

        write!(f, "  ")?;
        if !value.name.is_empty() {
            write!(f, "%{} = ", value.name)?;
        }
        match op {
            Operation::Alloca { allocated, align: a } => {
                write!(f, "alloca {}{}", allocated, align(*a))
            }
            Operation::Load { ty, ptr, align: a, ordering: o, atomic, volatile } => write!(
                f,
                "load {}{}, ptr {}{}{}",
                flags(*atomic, *volatile),
                ty,
                opnd(*ptr),
                ordering(*o),
                align(*a)
            ),
            Operation::Store { ty, value, ptr, align: a, ordering: o, atomic, volatile } => write!(
                f,
                "store {}{} {}, ptr {}{}{}",
                flags(*atomic, *volatile),
                ty,
                opnd(*value),
                opnd(*ptr),
                ordering(*o),
                align(*a)
            ),
            Operation::MemTransfer { kind, dest, src, len_ty, len, align: a } => write!(
                f,
                "{} ptr {}, ptr {}, {} {}{}",
                kind.name(),
                opnd(*dest),
                opnd(*src),
                len_ty,
                opnd(*len),
                align(*a)
            ),
            Operation::MemSet { dest, value, len_ty, len, align: a } => write!(
                f,
                "memset ptr {}, i8 {}, {} {}{}",
                opnd(*dest),
                opnd(*value),
                len_ty,
                opnd(*len),
                align(*a)
            ),
            Operation::CmpXchg { ptr, ty, cmp, new, success, failure, volatile } => write!(
                f,
                "cmpxchg {}ptr {}, {} {}, {} {}{}{}",
                flags(false, *volatile),
                opnd(*ptr),
                ty,
                opnd(*cmp),
                ty,
                opnd(*new),
                ordering(*success),
                ordering(*failure)
            ),
            Operation::AtomicRmw { op, ptr, ty, value, ordering: o, volatile } => write!(
                f,
                "atomicrmw {}{} ptr {}, {} {}{}",
                flags(false, *volatile),
                op.name(),
                opnd(*ptr),
                ty,
                opnd(*value),
                ordering(*o)
            ),
            Operation::Binary { op, ty, lhs, rhs } => {
                write!(f, "{} {} {}, {}", op.name(), ty, opnd(*lhs), opnd(*rhs))
            }
            Operation::ICmp { pred, ty, lhs, rhs } => {
                write!(f, "icmp {} {} {}, {}", pred.name(), ty, opnd(*lhs), opnd(*rhs))
            }
            Operation::Call { callee, ret_type, args } => {
                write!(f, "call ")?;
                if *ret_type != Type::Void {
                    write!(f, "{} ", ret_type)?;
                }
                write!(f, "@{}(", self.functions[*callee as usize].name)?;
                for (i, (ty, arg)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", ty, opnd(*arg))?;
                }
                write!(f, ")")
            }
            Operation::Br { target } => write!(f, "br {}", block(*target)),
            Operation::CondBr { cond, then_block, else_block } => write!(
                f,
                "condbr i1 {}, {}, {}",
                opnd(*cond),
                block(*then_block),
                block(*else_block)
            ),
            Operation::Ret { value: Some((ty, v)) } => write!(f, "ret {} {}", ty, opnd(*v)),
            Operation::Ret { value: None } => write!(f, "ret"),
            Operation::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl Default for TestIR {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TestIR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.data_layout.as_str().is_empty() {
            writeln!(f, "target datalayout = \"{}\"", self.data_layout.as_str())?;
        }

        for value in &self.values {
            if let ValueKind::Global { value_type, align } = &value.kind {
                write!(f, "@{} = global {}", value.name, value_type)?;
                if *align != 0 {
                    write!(f, ", align {}", align)?;
                }
                writeln!(f)?;
            }
        }

        for func in &self.functions {
            if func.declaration {
                write!(f, "declare {} @{}(", func.ret_type, func.name)?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                writeln!(f, ")")?;
                continue;
            }

            write!(f, "define {} @{}(", func.ret_type, func.name)?;
            for (i, &arg) in func.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let value = &self.values[arg as usize];
                write!(f, "{} ", value.ty)?;
                if let ValueKind::Arg { align } = value.kind {
                    if align != 0 {
                        write!(f, "align {} ", align)?;
                    }
                }
                write!(f, "%{}", value.name)?;
            }
            writeln!(f, ") {{")?;
            for block_idx in func.block_begin_idx..func.block_end_idx {
                let block = &self.blocks[block_idx as usize];
                writeln!(f, "{}:", block.name)?;
                for &inst in &block.insts {
                    self.write_inst(f, inst)?;
                    writeln!(f)?;
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}
