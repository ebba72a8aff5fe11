//! Tests for the module driver and the access printer pass.

use memaccess::access::{self, AccessRole};
use memaccess::core::IrAdaptor;
use memaccess::pass::{
    is_no_instrument, no_instrument_name, run_on_module, run_with_options, should_instrument,
    AccessPrinter, AccessStats, DriverOptions, FunctionPass, PassReport,
};
use memaccess::test_ir::{FuncRef, TestIR, TestIRAdaptor};

const MODULE: &str = r#"
target datalayout = "e-p:64:64-i64:64-n32:64"
@shared = global i64, align 8

declare void @NOINSTRUMENT_record(ptr, i64)

define void @NOINSTRUMENT_flush(ptr %p) {
entry:
  store i64 0, ptr %p, align 8
  ret
}

define void @_ZN7tracing16NOINSTRUMENT_logEv(ptr %p) {
entry:
  %v = load i8, ptr %p
  ret
}

define void @producer(ptr %buf, i64 %n) {
entry:
  memset ptr %buf, i8 0, i64 %n, align 8
  %old = atomicrmw add ptr @shared, i64 1 seq_cst
  call @NOINSTRUMENT_record(ptr %buf, i64 %n)
  ret
}

define i64 @consumer(ptr %buf) {
entry:
  %v = load i64, ptr %buf, align 8
  %ok = cmpxchg ptr @shared, i64 %v, i64 0 acq_rel monotonic
  ret i64 %v
}
"#;

fn load() -> TestIR {
    let _ = env_logger::builder().is_test(true).try_init();
    TestIR::parse(MODULE).unwrap()
}

/// Counts accesses per function and pretends to instrument each one.
#[derive(Default)]
struct CountingPass {
    per_function: Vec<(String, usize)>,
    finalized: bool,
}

impl<'ir> FunctionPass<TestIRAdaptor<'ir>> for CountingPass {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn run_on_function(&mut self, ir: &TestIRAdaptor<'ir>, func: FuncRef) -> bool {
        let found = access::collect(ir, func).len();
        self.per_function
            .push((ir.func_link_name(func).to_string(), found));
        found > 0
    }

    fn do_finalization(&mut self, _ir: &TestIRAdaptor<'ir>) -> bool {
        self.finalized = true;
        false
    }
}

#[test]
fn test_counting_pass() {
    let ir = load();
    let adaptor = TestIRAdaptor::new(&ir);
    let mut pass = CountingPass::default();
    let report = run_on_module(&adaptor, &mut pass);

    assert_eq!(
        pass.per_function,
        vec![("producer".to_string(), 3), ("consumer".to_string(), 3)]
    );
    assert!(pass.finalized);
    assert_eq!(
        report,
        PassReport {
            changed: true,
            functions_visited: 2,
            functions_skipped: 3,
        }
    );
}

#[test]
fn test_should_instrument_matches_naming_rules() {
    let ir = load();
    let adaptor = TestIRAdaptor::new(&ir);
    let eligible: Vec<_> = adaptor
        .funcs()
        .filter(|&f| should_instrument(&adaptor, f))
        .map(|f| adaptor.func_link_name(f))
        .collect();
    assert_eq!(eligible, vec!["producer", "consumer"]);

    assert!(is_no_instrument(&no_instrument_name("producer")));
    assert!(is_no_instrument("_ZN7tracing16NOINSTRUMENT_logEv"));
}

#[test]
fn test_printer_output_and_stats() {
    let ir = load();
    let adaptor = TestIRAdaptor::new(&ir);
    let mut printer = AccessPrinter::new();
    let report = run_on_module(&adaptor, &mut printer);
    assert!(!report.changed);

    let expected = "\
Function producer
  write (memset) ptr=%buf size=%n align=8
  read (atomicrmw %old) ptr=@shared size=8 align=8 atomic
  write (atomicrmw %old) ptr=@shared size=8 align=8 atomic
Function consumer
  read (load %v) ptr=%buf size=8 align=8
  read (cmpxchg %ok) ptr=@shared size=8 align=8 atomic
  write (cmpxchg %ok) ptr=@shared size=8 align=8 atomic
";
    assert_eq!(printer.output(), expected);
    assert_eq!(
        *printer.stats(),
        AccessStats {
            functions: 2,
            reads: 3,
            writes: 3,
            atomic: 4,
            dynamic_length: 1,
        }
    );
}

#[test]
fn test_printer_with_all_functions_and_role() {
    let ir = load();
    let adaptor = TestIRAdaptor::new(&ir);
    let mut printer = AccessPrinter::with_role(AccessRole::Read);
    let options = DriverOptions {
        include_no_instrument: true,
        only_function: None,
    };
    let report = run_with_options(&adaptor, &mut printer, &options);

    assert_eq!(report.functions_visited, 4);
    assert_eq!(report.functions_skipped, 1);
    assert!(printer.output().starts_with("Function NOINSTRUMENT_flush\nFunction _ZN7tracing16NOINSTRUMENT_logEv\n  read (load %v) ptr=%p size=1 align=0\n"));
    assert_eq!(printer.stats().writes, 0);
    assert_eq!(printer.stats().reads, 4);
}

#[test]
fn test_single_function_selection() {
    let ir = load();
    let adaptor = TestIRAdaptor::new(&ir);
    let mut printer = AccessPrinter::new();
    let options = DriverOptions {
        include_no_instrument: false,
        only_function: Some("consumer".to_string()),
    };
    let report = run_with_options(&adaptor, &mut printer, &options);

    assert_eq!(report.functions_visited, 1);
    assert!(printer.output().starts_with("Function consumer\n"));
    assert!(!printer.output().contains("producer"));
    assert_eq!(printer.into_output().lines().count(), 4);
}
