//! Pass that renders the memory access descriptors of each function.
//!
//! Output format, one block per visited function:
//!
//! ```text
//! Function copy
//!   read (load %v) ptr=%src size=8 align=4
//!   write (store) ptr=%dst size=8 align=0
//!   read (memcpy) ptr=%src size=%n align=1
//!   read (atomicrmw %old) ptr=@counter size=8 align=8 atomic
//! ```

use std::fmt;
use std::fmt::Write as _;

use super::FunctionPass;
use crate::access::{self, AccessLength, AccessOf, AccessRole};
use crate::core::IrAdaptor;

/// Tally of the descriptors an [`AccessPrinter`] has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    pub functions: u32,
    pub reads: u32,
    pub writes: u32,
    pub atomic: u32,
    pub dynamic_length: u32,
}

impl AccessStats {
    pub fn record<I: Copy, V: Copy>(&mut self, access: &access::MemAccess<I, V>) {
        match access.role() {
            AccessRole::Read => self.reads += 1,
            AccessRole::Write => self.writes += 1,
        }
        if access.is_atomic() {
            self.atomic += 1;
        }
        if !access.has_const_length() {
            self.dynamic_length += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.reads + self.writes
    }
}

impl fmt::Display for AccessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics")?;
        writeln!(f, "  functions: {}", self.functions)?;
        writeln!(f, "  reads: {}", self.reads)?;
        writeln!(f, "  writes: {}", self.writes)?;
        writeln!(f, "  atomic: {}", self.atomic)?;
        write!(f, "  dynamic-length: {}", self.dynamic_length)
    }
}

/// Collects and prints descriptors, optionally restricted to one role.
#[derive(Debug, Default)]
pub struct AccessPrinter {
    role: Option<AccessRole>,
    output: String,
    stats: AccessStats,
}

impl AccessPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only print accesses of the given role.
    pub fn with_role(role: AccessRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn stats(&self) -> &AccessStats {
        &self.stats
    }

    /// Render a single descriptor the way the pass prints it.
    pub fn format_access<A: IrAdaptor>(ir: &A, access: &AccessOf<A>) -> String {
        let size = match access.length() {
            AccessLength::Const(c) => c.value().to_string(),
            AccessLength::Operand(v) => ir.value_name(v),
        };
        let mut line = format!(
            "{} ({}) ptr={} size={} align={}",
            access.role().name(),
            ir.inst_label(access.instruction()),
            ir.value_name(access.pointer()),
            size,
            access.alignment()
        );
        if access.is_atomic() {
            line.push_str(" atomic");
        }
        line
    }
}

impl<A: IrAdaptor> FunctionPass<A> for AccessPrinter {
    fn name(&self) -> &'static str {
        "access-printer"
    }

    fn run_on_function(&mut self, ir: &A, func: A::FuncRef) -> bool {
        self.stats.functions += 1;
        // Writing into a String cannot fail.
        let _ = writeln!(self.output, "Function {}", ir.func_link_name(func));

        for inst in ir.func_insts(func) {
            let found = match self.role {
                Some(role) => access::classify(ir, inst, role).into_iter().collect::<Vec<_>>(),
                None => access::accesses(ir, inst).collect(),
            };
            for access in found {
                self.stats.record(&access);
                let _ = writeln!(self.output, "  {}", Self::format_access(ir, &access));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::run_on_module;
    use crate::test_ir::{TestIR, TestIRAdaptor};

    const MODULE: &str = r#"
target datalayout = "e-p:64:64-i64:64-n32:64"
@counter = global i64
define void @copy(ptr %dst, ptr %src, i64 %n) {
entry:
  %v = load i64, ptr %src, align 4
  store i64 %v, ptr %dst
  memcpy ptr %dst, ptr %src, i64 %n, align 1
  %old = atomicrmw add ptr @counter, i64 1 monotonic
  ret
}
"#;

    #[test]
    fn test_prints_all_roles() {
        let ir = TestIR::parse(MODULE).unwrap();
        let adaptor = TestIRAdaptor::new(&ir);
        let mut printer = AccessPrinter::new();
        run_on_module(&adaptor, &mut printer);

        let expected = "\
Function copy
  read (load %v) ptr=%src size=8 align=4
  write (store) ptr=%dst size=8 align=0
  read (memcpy) ptr=%src size=%n align=1
  write (memcpy) ptr=%dst size=%n align=1
  read (atomicrmw %old) ptr=@counter size=8 align=8 atomic
  write (atomicrmw %old) ptr=@counter size=8 align=8 atomic
";
        assert_eq!(printer.output(), expected);

        let stats = printer.stats();
        assert_eq!(stats.functions, 1);
        assert_eq!((stats.reads, stats.writes), (3, 3));
        assert_eq!(stats.atomic, 2);
        assert_eq!(stats.dynamic_length, 2);
        assert_eq!(stats.total(), 6);
    }

    #[test]
    fn test_role_filter() {
        let ir = TestIR::parse(MODULE).unwrap();
        let adaptor = TestIRAdaptor::new(&ir);
        let mut printer = AccessPrinter::with_role(AccessRole::Write);
        run_on_module(&adaptor, &mut printer);

        assert!(printer.output().lines().skip(1).all(|l| l.starts_with("  write")));
        assert_eq!(printer.stats().reads, 0);
        assert_eq!(printer.stats().writes, 3);
    }
}
