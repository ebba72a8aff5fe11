//! FileCheck-style validation of access printer output.
//!
//! This module extracts RUN and CHECK directives from TIR files, runs the
//! access printer the way the `memaccess` binary would, and validates its
//! output against the expected patterns, similar to LLVM's FileCheck tool.

use super::{TestIR, TestIRAdaptor};
use crate::access::AccessRole;
use crate::core::CheckError;
use crate::pass::{run_with_options, AccessPrinter, DriverOptions};

/// One expected-output directive of a file test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckDirective {
    /// CHECK: pattern - Match on this or any later line
    Check(String),
    /// CHECK-LABEL: pattern - Anchors a new section of the output
    CheckLabel(String),
    /// CHECK-NEXT: pattern - Must match the line right after the previous match
    CheckNext(String),
    /// CHECK-NOT: pattern - Must not occur before the next positive match
    CheckNot(String),
    /// CHECK-EMPTY - The next line must be blank
    CheckEmpty,
    /// COM: text - Ignored
    Comment(String),
}

/// The command line of a RUN directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirective {
    pub command: String,
    pub args: Vec<String>,
}

/// Directives and IR text of one file test.
#[derive(Debug)]
pub struct TestSpec {
    pub run_directives: Vec<RunDirective>,
    pub check_directives: Vec<CheckDirective>,
    pub tir_content: String,
}

impl TestSpec {
    /// Split a file into its RUN lines, CHECK lines and IR body.
    pub fn parse(content: &str) -> Self {
        let mut run_directives = Vec::new();
        let mut check_directives = Vec::new();
        let mut tir_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(run_cmd) = trimmed.strip_prefix("; RUN:") {
                let parts: Vec<&str> = run_cmd.split_whitespace().collect();
                if let Some((command, args)) = parts.split_first() {
                    run_directives.push(RunDirective {
                        command: command.to_string(),
                        args: args.iter().map(|s| s.to_string()).collect(),
                    });
                }
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-LABEL:") {
                check_directives.push(CheckDirective::CheckLabel(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NEXT:") {
                check_directives.push(CheckDirective::CheckNext(pattern.trim().to_string()));
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK-NOT:") {
                check_directives.push(CheckDirective::CheckNot(pattern.trim().to_string()));
            } else if trimmed.starts_with("; CHECK-EMPTY") {
                check_directives.push(CheckDirective::CheckEmpty);
            } else if let Some(pattern) = trimmed.strip_prefix("; CHECK:") {
                check_directives.push(CheckDirective::Check(pattern.trim().to_string()));
            } else if let Some(comment) = trimmed.strip_prefix("; COM:") {
                check_directives.push(CheckDirective::Comment(comment.trim().to_string()));
            } else {
                // Regular TIR content
                tir_lines.push(line);
            }
        }

        TestSpec {
            run_directives,
            check_directives,
            tir_content: tir_lines.join("\n"),
        }
    }
}

/// Options understood on a RUN line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RunOptions {
    role: Option<AccessRole>,
    include_no_instrument: bool,
    print_ir: bool,
    stats: bool,
}

impl RunOptions {
    fn parse(run_dir: &RunDirective) -> Result<Self, CheckError> {
        let mut options = RunOptions::default();
        let mut args = run_dir.args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "%s" => {}
                "--all" => options.include_no_instrument = true,
                "--print-ir" => options.print_ir = true,
                "--stats" => options.stats = true,
                "--role" => {
                    options.role = match args.next().map(String::as_str) {
                        Some("read") => Some(AccessRole::Read),
                        Some("write") => Some(AccessRole::Write),
                        Some("both") => None,
                        Some(other) => return Err(CheckError::UnknownOption(format!("--role {}", other))),
                        None => return Err(CheckError::UnknownOption("--role".to_string())),
                    }
                }
                other => return Err(CheckError::UnknownOption(other.to_string())),
            }
        }
        Ok(options)
    }
}

/// Runs file tests through the access printer.
pub struct TestRunner {
    verbose: bool,
}

impl TestRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Parse the IR, run every RUN line and check the combined output.
    pub fn run_test(&self, spec: &TestSpec) -> Result<(), CheckError> {
        let ir = TestIR::parse(&spec.tir_content)?;

        if spec.run_directives.is_empty() {
            return Err(CheckError::MissingRun);
        }

        for run_dir in &spec.run_directives {
            let output = self.execute_command(&ir, run_dir)?;
            self.validate_output(&output, &spec.check_directives)?;
        }

        Ok(())
    }

    /// Produce the output of a single RUN line.
    pub fn execute_command(&self, ir: &TestIR, run_dir: &RunDirective) -> Result<String, CheckError> {
        let options = RunOptions::parse(run_dir)?;
        let mut output = String::new();

        if options.print_ir {
            output.push_str("Printing IR\n");
            output.push_str(&ir.print());
        }

        let adaptor = TestIRAdaptor::new(ir);
        let mut printer = match options.role {
            Some(role) => AccessPrinter::with_role(role),
            None => AccessPrinter::new(),
        };
        let driver = DriverOptions {
            include_no_instrument: options.include_no_instrument,
            only_function: None,
        };
        run_with_options(&adaptor, &mut printer, &driver);
        output.push_str(printer.output());

        if options.stats {
            output.push_str(&printer.stats().to_string());
            output.push('\n');
        }

        if self.verbose {
            log::info!("output of '{}':\n{}", run_dir.command, output);
        }
        Ok(output)
    }

    /// Match `output` against the directives in order.
    pub fn validate_output(
        &self,
        output: &str,
        directives: &[CheckDirective],
    ) -> Result<(), CheckError> {
        let output_lines: Vec<&str> = output.lines().collect();
        let mut line_idx = 0;
        let mut pending_not: Vec<&str> = Vec::new();

        let not_found = |kind: &'static str, pattern: &str, line: usize| CheckError::NotFound {
            kind,
            pattern: pattern.to_string(),
            line,
            output: output.to_string(),
        };

        for directive in directives {
            let (kind, matched) = match directive {
                CheckDirective::Comment(_) => continue,

                CheckDirective::CheckNot(pattern) => {
                    pending_not.push(pattern);
                    continue;
                }

                CheckDirective::Check(pattern) | CheckDirective::CheckLabel(pattern) => {
                    let kind = if matches!(directive, CheckDirective::Check(_)) {
                        ""
                    } else {
                        "-LABEL"
                    };
                    let found = output_lines
                        .iter()
                        .skip(line_idx)
                        .position(|line| line.contains(pattern.as_str()));
                    match found {
                        Some(idx) => (kind, line_idx + idx),
                        None => return Err(not_found(kind, pattern, line_idx)),
                    }
                }

                CheckDirective::CheckNext(pattern) => match output_lines.get(line_idx) {
                    Some(line) if line.contains(pattern.as_str()) => ("-NEXT", line_idx),
                    _ => return Err(not_found("-NEXT", pattern, line_idx)),
                },

                CheckDirective::CheckEmpty => match output_lines.get(line_idx) {
                    // End of output counts as empty
                    None => continue,
                    Some(line) if line.trim().is_empty() => ("-EMPTY", line_idx),
                    Some(_) => return Err(not_found("-EMPTY", "", line_idx)),
                },
            };

            Self::check_excluded(&output_lines[line_idx..matched], line_idx, &pending_not, output)?;
            pending_not.clear();

            if self.verbose {
                log::debug!("CHECK{} matched line {}", kind, matched);
            }
            line_idx = matched + 1;
        }

        let rest = &output_lines[line_idx.min(output_lines.len())..];
        Self::check_excluded(rest, line_idx, &pending_not, output)
    }

    fn check_excluded(
        lines: &[&str],
        first_line: usize,
        patterns: &[&str],
        output: &str,
    ) -> Result<(), CheckError> {
        for (offset, line) in lines.iter().enumerate() {
            if let Some(pattern) = patterns.iter().find(|p| line.contains(**p)) {
                return Err(CheckError::Excluded {
                    pattern: pattern.to_string(),
                    line: first_line + offset,
                    output: output.to_string(),
                });
            }
        }
        Ok(())
    }
}
