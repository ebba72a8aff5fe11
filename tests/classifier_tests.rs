//! Integration tests for the read and write classifiers on TIR modules.

use memaccess::access::{self, AccessLength, AccessRole, MemRead, MemWrite};
use memaccess::core::{InstKind, IrAdaptor, Type};
use memaccess::test_ir::{InstRef, Operation, TestIR, TestIRAdaptor, ValueKind};

fn load(source: &str) -> TestIR {
    let _ = env_logger::builder().is_test(true).try_init();
    TestIR::parse(source).unwrap_or_else(|e| panic!("failed to parse TIR: {}", e))
}

fn insts(adaptor: &TestIRAdaptor<'_>, func: &str) -> Vec<InstRef> {
    let func = adaptor.func_by_name(func).expect("function");
    adaptor.func_insts(func).collect()
}

#[test]
fn test_load_then_store_scenario() {
    let ir = load(
        r#"
define void @f(ptr %p) {
entry:
  %v = load i64, ptr %p, align 4
  store i64 %v, ptr %p
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let insts = insts(&adaptor, "f");
    let p = adaptor.local("f", "p").unwrap();

    let read = MemRead::try_create(&adaptor, insts[0]).unwrap();
    assert!(read.is_read());
    assert_eq!(read.pointer(), p);
    assert_eq!(read.const_length(), Some(8));
    assert_eq!(read.alignment(), 4);
    assert_eq!(read.instruction(), insts[0]);

    let write = MemWrite::try_create(&adaptor, insts[1]).unwrap();
    assert!(!write.is_read());
    assert_eq!(write.pointer(), p);
    assert_eq!(write.const_length(), Some(8));
    assert_eq!(write.alignment(), 0);
}

#[test]
fn test_every_load_is_a_read_only() {
    let ir = load(
        r#"
target datalayout = "e-p:64:64-i64:64-n8:16:32:64"
define void @f(ptr %p) {
entry:
  %a = load i8, ptr %p
  %b = load i32, ptr %p, align 2
  %c = load volatile [5 x i16], ptr %p, align 1
  %d = load ptr, ptr %p, align 8
  %e = load <2 x i64>, ptr %p, align 16
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let expected = [(1, 0), (4, 2), (10, 1), (8, 8), (16, 16)];
    for (inst, (size, align)) in insts(&adaptor, "f").into_iter().zip(expected) {
        let read = MemRead::try_create(&adaptor, inst).unwrap();
        assert_eq!(read.const_length(), Some(size));
        assert_eq!(read.alignment(), align);
        assert!(!read.is_atomic());
        assert!(MemWrite::try_create(&adaptor, inst).is_none());
    }
}

#[test]
fn test_dual_role_atomics_agree() {
    let ir = load(
        r#"
target datalayout = "e-p:64:64-i64:64-n8:16:32:64"
@g = global i64, align 32
define void @f(ptr %p, ptr align 4 %q) {
entry:
  %s = alloca i16
  %a = cmpxchg ptr %p, i8 0, i8 1
  %b = cmpxchg ptr @g, i64 0, i64 1 seq_cst seq_cst
  %c = atomicrmw add ptr %q, i32 1 monotonic
  %d = atomicrmw xchg ptr %s, i16 3
  %e = atomicrmw umax ptr @g, i64 9 seq_cst
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let all = insts(&adaptor, "f");
    let atomics = &all[1..6];
    let expected = [(1, 0), (8, 32), (4, 4), (2, 2), (8, 32)];

    for (&inst, (size, align)) in atomics.iter().zip(expected) {
        let read = MemRead::try_create(&adaptor, inst).unwrap();
        let write = MemWrite::try_create(&adaptor, inst).unwrap();
        assert_eq!(read.pointer(), write.pointer());
        assert_eq!(read.length(), write.length());
        assert_eq!(read.alignment(), write.alignment());
        assert!(read.is_read() && !write.is_read());
        assert!(read.is_atomic() && write.is_atomic());
        assert_eq!(read.const_length(), Some(size));
        assert_eq!(read.alignment(), align);
    }
}

#[test]
fn test_bulk_transfers_use_length_operand() {
    let ir = load(
        r#"
define void @f(ptr %dst, ptr %src, i64 %n, i32 %m) {
entry:
  memcpy ptr %dst, ptr %src, i64 %n, align 4
  memmove ptr %dst, ptr %src, i32 %m
  memset ptr %dst, i8 255, i64 %n, align 2
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let insts = insts(&adaptor, "f");
    let dst = adaptor.local("f", "dst").unwrap();
    let src = adaptor.local("f", "src").unwrap();
    let n = adaptor.local("f", "n").unwrap();
    let m = adaptor.local("f", "m").unwrap();

    let read = MemRead::try_create(&adaptor, insts[0]).unwrap();
    let write = MemWrite::try_create(&adaptor, insts[0]).unwrap();
    assert_eq!(read.pointer(), src);
    assert_eq!(write.pointer(), dst);
    assert_eq!(read.length(), AccessLength::Operand(n));
    assert_eq!(write.length(), AccessLength::Operand(n));
    assert_eq!((read.alignment(), write.alignment()), (4, 4));
    assert!(!read.has_const_length());

    let read = MemRead::try_create(&adaptor, insts[1]).unwrap();
    assert_eq!(read.length().as_operand(), Some(m));
    assert_eq!(read.alignment(), 0);

    assert!(MemRead::try_create(&adaptor, insts[2]).is_none());
    let fill = MemWrite::try_create(&adaptor, insts[2]).unwrap();
    assert_eq!(fill.pointer(), dst);
    assert_eq!(fill.length(), AccessLength::Operand(n));
    assert_eq!(fill.alignment(), 2);
    assert!(!fill.is_atomic());
}

#[test]
fn test_non_memory_instructions_are_absent() {
    let ir = load(
        r#"
declare i32 @g(i32)
define i32 @f(i32 %x) {
entry:
  %slot = alloca i32, align 4
  %y = add i32 %x, 1
  %c = icmp eq i32 %y, 0
  %r = call i32 @g(i32 %y)
  condbr i1 %c, ^a, ^b
a:
  ret i32 %r
b:
  unreachable
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    for inst in insts(&adaptor, "f") {
        assert!(matches!(adaptor.inst_kind(inst), InstKind::Other));
        assert!(MemRead::try_create(&adaptor, inst).is_none());
        assert!(MemWrite::try_create(&adaptor, inst).is_none());
        assert_eq!(access::accesses(&adaptor, inst).count(), 0);
    }
}

#[test]
fn test_constant_length_uses_largest_legal_int() {
    let source = |layout: &str| {
        format!(
            "target datalayout = \"{}\"\ndefine void @f(ptr %p) {{\nentry:\n  %v = load i64, ptr %p\n  ret\n}}\n",
            layout
        )
    };
    let cases = [
        ("e-p:64:64-i64:64-n8:16:32:64-S128", 64),
        ("e-p:32:32-n8:16:32", 32),
        ("e-p:16:16-n8:16", 16),
        ("e-p:32:32", 32),
        ("e", 64),
    ];
    for (layout, bits) in cases {
        let ir = load(&source(layout));
        let adaptor = TestIRAdaptor::new(&ir);
        let inst = insts(&adaptor, "f")[0];
        match MemRead::try_create(&adaptor, inst).unwrap().length() {
            AccessLength::Const(c) => {
                assert_eq!(c.value(), 8, "layout {}", layout);
                assert_eq!(c.bits(), bits, "layout {}", layout);
            }
            AccessLength::Operand(_) => panic!("expected constant length for {}", layout),
        }
    }
}

#[test]
fn test_oversized_load_never_overflows() {
    let err = TestIR::parse(
        "define void @f(ptr %p) {\nentry:\n  %v = load [4611686018427387904 x i64], ptr %p, align 8\n  ret\n}\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("is too large"), "{err}");

    // Modules built or edited in memory skip the parser's size check.
    let mut ir = load(
        r#"
define void @f(ptr %p) {
entry:
  %v = load i64, ptr %p, align 8
  ret
}
"#,
    );
    for value in &mut ir.values {
        if let ValueKind::Inst(Operation::Load { ty, .. }) = &mut value.kind {
            *ty = Type::array(1 << 62, Type::int(64));
        }
    }
    let adaptor = TestIRAdaptor::new(&ir);
    let inst = insts(&adaptor, "f")[0];
    let read = MemRead::try_create(&adaptor, inst).unwrap();
    assert_eq!(read.const_length(), Some(u64::MAX));
    assert_eq!(read.alignment(), 8);
}

#[test]
fn test_atomic_loads_and_stores() {
    let ir = load(
        r#"
define void @f(ptr %p) {
entry:
  %v = load atomic i32, ptr %p seq_cst, align 4
  store atomic volatile i32 %v, ptr %p release, align 4
  store volatile i32 %v, ptr %p, align 4
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let insts = insts(&adaptor, "f");
    assert!(MemRead::try_create(&adaptor, insts[0]).unwrap().is_atomic());
    assert!(MemWrite::try_create(&adaptor, insts[1]).unwrap().is_atomic());
    assert!(!MemWrite::try_create(&adaptor, insts[2]).unwrap().is_atomic());
}

#[test]
fn test_classify_and_collect() {
    let ir = load(
        r#"
define void @f(ptr %p) {
entry:
  %v = load i32, ptr %p
  %o = atomicrmw or ptr %p, i32 %v
  store i32 %v, ptr %p
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let insts = insts(&adaptor, "f");

    assert!(access::classify(&adaptor, insts[0], AccessRole::Read).is_some());
    assert!(access::classify(&adaptor, insts[0], AccessRole::Write).is_none());
    assert!(access::classify(&adaptor, insts[2], AccessRole::Write).is_some());

    let func = adaptor.func_by_name("f").unwrap();
    let all = access::collect(&adaptor, func);
    let roles: Vec<_> = all.iter().map(|a| (a.instruction(), a.role())).collect();
    assert_eq!(
        roles,
        vec![
            (insts[0], AccessRole::Read),
            (insts[1], AccessRole::Read),
            (insts[1], AccessRole::Write),
            (insts[2], AccessRole::Write),
        ]
    );
}

#[test]
fn test_classification_is_repeatable_across_threads() {
    let ir = load(
        r#"
@g = global i32
define void @f(ptr %p, i64 %n) {
entry:
  %v = load i32, ptr @g, align 4
  memcpy ptr %p, ptr @g, i64 %n
  %o = cmpxchg ptr @g, i32 %v, i32 0
  store i32 %v, ptr %p
  ret
}
"#,
    );
    let adaptor = TestIRAdaptor::new(&ir);
    let func = adaptor.func_by_name("f").unwrap();
    let expected = access::collect(&adaptor, func);
    assert_eq!(expected.len(), 6);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| access::collect(&adaptor, func)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
