// This module drives per-function work over a whole module. A FunctionPass receives an
// initialization call, one run_on_function call per eligible function, and a
// finalization call, mirroring how instrumentation passes are scheduled by a compiler.
// Eligibility is decided here: declarations have no body to instrument and functions
// following the NOINSTRUMENT_ naming convention opt out (they are the runtime helpers an
// instrumentation inserts calls to). The driver reports whether any hook changed the
// module and how many functions were visited or skipped. The AccessPrinter pass, which
// renders every memory access descriptor of a function, lives in the printer module.

//! Module and function pass driver.

pub mod no_instrument;
pub mod printer;

pub use no_instrument::{is_no_instrument, no_instrument_name, NOINSTRUMENT_PREFIX};
pub use printer::{AccessPrinter, AccessStats};

use crate::core::IrAdaptor;

/// Work performed on each eligible function of a module.
pub trait FunctionPass<A: IrAdaptor> {
    fn name(&self) -> &'static str;

    /// Called once before any function. Returns whether the module changed.
    fn do_initialization(&mut self, _ir: &A) -> bool {
        false
    }

    /// Called for each eligible function. Returns whether the function changed.
    fn run_on_function(&mut self, ir: &A, func: A::FuncRef) -> bool;

    /// Called once after all functions. Returns whether the module changed.
    fn do_finalization(&mut self, _ir: &A) -> bool {
        false
    }
}

/// Outcome of [`run_on_module`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub changed: bool,
    pub functions_visited: u32,
    pub functions_skipped: u32,
}

/// Which functions the driver hands to the pass.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Also visit functions named with [`NOINSTRUMENT_PREFIX`].
    pub include_no_instrument: bool,
    /// Only visit the function with this linkage name.
    pub only_function: Option<String>,
}

/// Whether a function is eligible for instrumentation.
pub fn should_instrument<A: IrAdaptor>(ir: &A, func: A::FuncRef) -> bool {
    !ir.func_is_declaration(func) && !is_no_instrument(ir.func_link_name(func))
}

/// Run `pass` over every eligible function of the module.
pub fn run_on_module<A, P>(ir: &A, pass: &mut P) -> PassReport
where
    A: IrAdaptor,
    P: FunctionPass<A>,
{
    run_with_options(ir, pass, &DriverOptions::default())
}

/// Run `pass` over the functions selected by `options`.
pub fn run_with_options<A, P>(ir: &A, pass: &mut P, options: &DriverOptions) -> PassReport
where
    A: IrAdaptor,
    P: FunctionPass<A>,
{
    let mut report = PassReport::default();
    report.changed |= pass.do_initialization(ir);

    for func in ir.funcs() {
        let name = ir.func_link_name(func);
        let skip_reason = if ir.func_is_declaration(func) {
            Some("declaration")
        } else if !options.include_no_instrument && is_no_instrument(name) {
            Some("no-instrument")
        } else if options.only_function.as_deref().is_some_and(|only| only != name) {
            Some("not selected")
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            log::debug!("{}: skipping {} ({})", pass.name(), name, reason);
            report.functions_skipped += 1;
            continue;
        }

        report.changed |= pass.run_on_function(ir, func);
        report.functions_visited += 1;
    }

    report.changed |= pass.do_finalization(ir);
    log::info!(
        "{}: visited {} of {} functions, {} skipped",
        pass.name(),
        report.functions_visited,
        ir.func_count(),
        report.functions_skipped
    );
    report
}
