//! LLVM integration.
//!
//! This module runs the memory access classifiers on real LLVM modules through
//! inkwell. It is only built with the `llvm` feature since it links against an
//! installed LLVM.
//!
//! # Example
//! ```ignore
//! use inkwell::context::Context;
//! use memaccess::llvm::LlvmAdaptor;
//! use memaccess::pass::{run_on_module, AccessPrinter};
//!
//! let context = Context::create();
//! let module = context.create_module_from_ir(buffer)?;
//! let adaptor = LlvmAdaptor::new(&module)?;
//! let mut printer = AccessPrinter::new();
//! run_on_module(&adaptor, &mut printer);
//! ```

pub mod adaptor;

pub use adaptor::{LlvmAdaptor, LlvmLayout};
