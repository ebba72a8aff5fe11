//! Integration tests for TIR (Test IR) files.
//!
//! These tests load the file tests directly and check the parsed structure and
//! the printer, independently of the CHECK directives.

use memaccess::core::{ParseError, Type};
use memaccess::test_ir::parser::parse_ir;
use memaccess::test_ir::{Operation, TestIR, ValueKind};
use std::fs;
use std::path::Path;

/// Helper to load and parse a TIR file from the test directory
fn load_tir_file(filename: &str) -> TestIR {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/filetest")
        .join(filename);
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));

    TestIR::parse(&contents).unwrap_or_else(|e| panic!("Failed to parse {filename}: {e}"))
}

/// Helper to check if output contains expected patterns
fn check_output_contains(output: &str, patterns: &[&str]) {
    for pattern in patterns {
        assert!(
            output.contains(pattern),
            "Output missing expected pattern: '{pattern}'\nFull output:\n{output}"
        );
    }
}

#[test]
fn test_atomics_tir() {
    let ir = load_tir_file("atomics.tir");
    let output = ir.print();

    check_output_contains(
        &output,
        &[
            "target datalayout = \"e-p:64:64-i64:64-n8:16:32:64\"",
            "@counter = global i64",
            "@flag = global i32, align 16",
            "%slot = alloca i16",
            "%old = cmpxchg ptr @counter, i64 0, i64 1 seq_cst seq_cst",
            "%prev = atomicrmw add ptr @flag, i32 1 monotonic",
            "%y = cmpxchg volatile ptr %p, i32 0, i32 1 acquire monotonic",
            "%a = load atomic i32, ptr %p acquire, align 4",
            "store atomic i32 %a, ptr %p release, align 4",
        ],
    );

    assert_eq!(ir.functions.len(), 1);
    assert_eq!(ir.functions[0].name, "atomics");
    assert_eq!(ir.blocks.len(), 1);
    assert_eq!(ir.blocks[0].insts.len(), 8);
}

#[test]
fn test_control_flow_tir() {
    let ir = load_tir_file("control_flow.tir");

    assert_eq!(ir.functions.len(), 2);
    assert!(ir.functions[0].declaration);
    let func = &ir.functions[1];
    assert_eq!(func.ret_type, Type::Int(32));
    let names: Vec<_> = (func.block_begin_idx..func.block_end_idx)
        .map(|b| ir.blocks[b as usize].name.as_str())
        .collect();
    assert_eq!(names, vec!["entry", "head", "body", "exit"]);

    // Every block ends in a terminator.
    for block in &ir.blocks[func.block_begin_idx as usize..func.block_end_idx as usize] {
        let last = *block.insts.last().unwrap();
        match &ir.values[last as usize].kind {
            ValueKind::Inst(op) => assert!(op.is_terminator(), "{} ends in {}", block.name, op.name()),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_all_files_reprint_identically() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/filetest");
    for entry in fs::read_dir(dir).unwrap().flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".tir") {
            continue;
        }
        let ir = load_tir_file(&name);
        let printed = ir.print();
        let reparsed = TestIR::parse(&printed)
            .unwrap_or_else(|e| panic!("{name}: printed IR does not parse: {e}\n{printed}"));
        assert_eq!(reparsed.print(), printed, "{name}");
        assert_eq!(reparsed.functions.len(), ir.functions.len(), "{name}");
    }
}

#[test]
fn test_memset_constant_length() {
    let ir = load_tir_file("print_ir.tir");
    let memset = ir.blocks[0].insts[0];
    match &ir.values[memset as usize].kind {
        ValueKind::Inst(Operation::MemSet { len_ty, len, align, .. }) => {
            assert_eq!(*len_ty, Type::Int(32));
            assert_eq!(ir.values[*len as usize].kind, ValueKind::ConstInt(16));
            assert_eq!(*align, 4);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ir.data_layout.pointer_size_bits(), 32);
}

#[test]
fn test_error_locations() {
    let err = parse_ir("define void @f(ptr %p) {\nentry:\n  store i32 %missing, ptr %p\n  ret\n}\n")
        .unwrap_err();
    assert_eq!(
        err,
        ParseError::UndefinedValue {
            line: 3,
            column: 13,
            name: "%missing".to_string()
        }
    );
    assert_eq!(err.to_string(), "3:13: use of undefined value '%missing'");

    let err = parse_ir("target datalayout = \"e-q64\"\n").unwrap_err();
    assert!(matches!(err, ParseError::Layout { line: 1, .. }), "{err:?}");
}
