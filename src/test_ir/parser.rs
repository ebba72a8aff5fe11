//! TIR (Test IR) parser implementation.

use super::*;
use crate::core::{LayoutError, ParseError};
use hashbrown::HashMap;

pub fn parse_ir(text: &str) -> ParseResult<TestIR> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    ir: TestIR,

    // Global maps
    globals: HashMap<&'a str, u32>,
    funcs: HashMap<&'a str, u32>,
    func_resolves: Vec<Resolve<'a>>,

    // Per-function maps
    blocks: HashMap<&'a str, u32>,
    values: HashMap<&'a str, u32>,
    block_resolves: Vec<Resolve<'a>>,
}

/// A reference by name to patch once the target is known.
#[derive(Debug)]
struct Resolve<'a> {
    name: &'a str,
    /// Instruction holding the reference.
    index: u32,
    /// Which block operand of the instruction (branches only).
    slot: u8,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            ir: TestIR::new(),
            globals: HashMap::new(),
            funcs: HashMap::new(),
            func_resolves: Vec::new(),
            blocks: HashMap::new(),
            values: HashMap::new(),
            block_resolves: Vec::new(),
        }
    }

    fn parse(mut self) -> ParseResult<TestIR> {
        self.skip_whitespace();

        while !self.is_eof() {
            let keyword_pos = self.pos;
            if self.current_char() == Some('@') {
                self.parse_global()?;
            } else {
                match self.read_identifier()? {
                    "target" => self.parse_target()?,
                    "declare" => self.parse_function(true)?,
                    "define" => self.parse_function(false)?,
                    other => {
                        self.pos = keyword_pos;
                        return Err(self.error(format!(
                            "expected 'target', 'declare', 'define' or a global, found '{}'",
                            other
                        )));
                    }
                }
            }
            self.skip_whitespace();
        }

        self.resolve_calls()?;

        log::debug!(
            "Parsed TIR: {} functions, {} blocks, {} values",
            self.ir.functions.len(),
            self.ir.blocks.len(),
            self.ir.values.len()
        );
        Ok(self.ir)
    }

    // ---------------------------------------------------------------------
    // Lexing helpers
    // ---------------------------------------------------------------------

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    /// Line and column (both 1-based) of a byte offset.
    fn location(&self, pos: usize) -> (usize, usize) {
        let before = &self.text[..pos.min(self.text.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
        (line, column)
    }

    fn error(&self, message: String) -> ParseError {
        let (line, column) = self.location(self.pos);
        ParseError::Syntax {
            line,
            column,
            message,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Skip comment line
                while let Some(ch) = self.current_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Whether only blanks or a comment remain on the current line.
    fn at_line_end(&self) -> bool {
        for ch in self.text[self.pos..].chars() {
            match ch {
                ' ' | '\t' => continue,
                '\n' | '\r' | ';' | '}' => return true,
                _ => return false,
            }
        }
        true
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> ParseResult<()> {
        if !self.try_read(ch) {
            return Err(self.error(format!(
                "expected '{}' but found {}",
                ch,
                self.describe_current()
            )));
        }
        Ok(())
    }

    fn describe_current(&self) -> String {
        match self.current_char() {
            Some(ch) => format!("'{}'", ch),
            None => "end of input".to_string(),
        }
    }

    fn is_ident_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '$'
    }

    fn read_identifier(&mut self) -> ParseResult<&'a str> {
        self.skip_whitespace();
        let start = self.pos;

        match self.current_char() {
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '.' || ch == '$' => {}
            _ => {
                return Err(self.error(format!(
                    "expected identifier but found {}",
                    self.describe_current()
                )))
            }
        }

        while let Some(ch) = self.current_char() {
            if Self::is_ident_char(ch) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(&self.text[start..self.pos])
    }

    /// Name after a sigil; value names may also start with a digit (`%0`).
    fn read_name(&mut self) -> ParseResult<&'a str> {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if Self::is_ident_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error(format!("expected name but found {}", self.describe_current())));
        }
        Ok(&self.text[start..self.pos])
    }

    /// Consume `keyword` if it is the next identifier.
    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = &self.text[self.pos..];
        if rest.starts_with(keyword)
            && !rest[keyword.len()..]
                .chars()
                .next()
                .is_some_and(Self::is_ident_char)
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if !self.try_keyword(keyword) {
            return Err(self.error(format!(
                "expected '{}' but found {}",
                keyword,
                self.describe_current()
            )));
        }
        Ok(())
    }

    fn read_number(&mut self) -> ParseResult<u64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.current_char().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error(format!("expected number but found {}", self.describe_current())));
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|e| self.error(format!("failed to parse number: {}", e)))
    }

    fn read_u32(&mut self) -> ParseResult<u32> {
        let number = self.read_number()?;
        u32::try_from(number).map_err(|_| self.error(format!("number {} is too large", number)))
    }

    fn read_string(&mut self) -> ParseResult<&'a str> {
        self.expect('"')?;
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if ch == '"' {
                let s = &self.text[start..self.pos];
                self.advance();
                return Ok(s);
            }
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        Err(self.error("unterminated string".to_string()))
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    /// Parse a type whose size fits the current data layout.
    fn parse_type(&mut self) -> ParseResult<Type> {
        self.skip_whitespace();
        let start = self.pos;
        let ty = self.parse_type_syntax()?;
        if self.ir.data_layout.checked_type_alloc_size(&ty).is_none() {
            self.pos = start;
            return Err(self.error(format!("type '{}' is too large", ty)));
        }
        Ok(ty)
    }

    fn parse_type_syntax(&mut self) -> ParseResult<Type> {
        match self.current_char() {
            Some('<') => {
                self.advance();
                let len = self.read_u32()?;
                self.expect_keyword("x")?;
                let elem = self.parse_type()?;
                self.expect('>')?;
                Ok(Type::vector(len, elem))
            }
            Some('[') => {
                self.advance();
                let len = self.read_number()?;
                self.expect_keyword("x")?;
                let elem = self.parse_type()?;
                self.expect(']')?;
                Ok(Type::array(len, elem))
            }
            Some('{') => {
                self.advance();
                let mut fields = Vec::new();
                if !self.try_read('}') {
                    loop {
                        fields.push(self.parse_type()?);
                        if self.try_read('}') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                Ok(Type::Struct(fields))
            }
            _ => {
                let start = self.pos;
                let name = self.read_identifier()?;
                let ty = match name {
                    "void" => Type::Void,
                    "half" => Type::Half,
                    "float" => Type::Float,
                    "double" => Type::Double,
                    "fp128" => Type::Fp128,
                    "ptr" => Type::Ptr,
                    _ => match name.strip_prefix('i').and_then(|bits| bits.parse::<u32>().ok()) {
                        Some(bits) if bits > 0 => Type::Int(bits),
                        _ => {
                            self.pos = start;
                            return Err(self.error(format!("unknown type '{}'", name)));
                        }
                    },
                };
                Ok(ty)
            }
        }
    }

    fn parse_sized_type(&mut self) -> ParseResult<Type> {
        let start = self.pos;
        let ty = self.parse_type()?;
        if !ty.is_sized() {
            self.pos = start;
            return Err(self.error(format!("type '{}' is not sized", ty)));
        }
        Ok(ty)
    }

    // ---------------------------------------------------------------------
    // Operands
    // ---------------------------------------------------------------------

    fn push_value(&mut self, name: &str, ty: Type, kind: ValueKind) -> u32 {
        let idx = self.ir.values.len() as u32;
        self.ir.values.push(Value {
            name: name.to_string(),
            ty,
            kind,
        });
        idx
    }

    /// Parse an operand of type `ty`: `%local`, `@global`, an integer, `null`, `true` or `false`.
    fn parse_value(&mut self, ty: &Type) -> ParseResult<u32> {
        self.skip_whitespace();
        let start = self.pos;
        match self.current_char() {
            Some('%') => {
                self.advance();
                let name = self.read_name()?;
                let idx = self.values.get(name).copied().ok_or_else(|| {
                    let (line, column) = self.location(start);
                    ParseError::UndefinedValue {
                        line,
                        column,
                        name: format!("%{}", name),
                    }
                })?;
                self.check_operand_type(idx, ty, start)
            }
            Some('@') => {
                self.advance();
                let name = self.read_name()?;
                let idx = self.globals.get(name).copied().ok_or_else(|| {
                    let (line, column) = self.location(start);
                    ParseError::UndefinedValue {
                        line,
                        column,
                        name: format!("@{}", name),
                    }
                })?;
                self.check_operand_type(idx, ty, start)
            }
            Some(ch) if ch == '-' || ch.is_ascii_digit() => {
                if !ty.is_integer() {
                    return Err(self.error(format!("integer constant used with type '{}'", ty)));
                }
                let negative = ch == '-';
                if negative {
                    self.advance();
                }
                let magnitude = self.read_number()?;
                let value = if negative {
                    magnitude.wrapping_neg()
                } else {
                    magnitude
                };
                let value = match ty {
                    Type::Int(bits) if *bits < 64 => value & ((1u64 << bits) - 1),
                    _ => value,
                };
                Ok(self.push_value("", ty.clone(), ValueKind::ConstInt(value)))
            }
            _ => {
                if self.try_keyword("null") {
                    if !ty.is_pointer() {
                        self.pos = start;
                        return Err(self.error(format!("'null' used with type '{}'", ty)));
                    }
                    Ok(self.push_value("", ty.clone(), ValueKind::Null))
                } else if self.try_keyword("true") {
                    Ok(self.push_value("", ty.clone(), ValueKind::ConstInt(1)))
                } else if self.try_keyword("false") {
                    Ok(self.push_value("", ty.clone(), ValueKind::ConstInt(0)))
                } else {
                    Err(self.error(format!("expected operand but found {}", self.describe_current())))
                }
            }
        }
    }

    /// A named operand must be used at the type it was defined with.
    fn check_operand_type(&self, idx: u32, ty: &Type, start: usize) -> ParseResult<u32> {
        let actual = &self.ir.values[idx as usize].ty;
        if actual == ty {
            return Ok(idx);
        }
        let (line, column) = self.location(start);
        Err(ParseError::Syntax {
            line,
            column,
            message: format!(
                "'{}' has type '{}' but is used as '{}'",
                self.ir.operand_string(idx),
                actual,
                ty
            ),
        })
    }

    fn parse_typed_value(&mut self) -> ParseResult<(Type, u32)> {
        let ty = self.parse_type()?;
        let value = self.parse_value(&ty)?;
        Ok((ty, value))
    }

    fn parse_pointer(&mut self) -> ParseResult<u32> {
        let start = self.pos;
        let ty = self.parse_type()?;
        if !ty.is_pointer() {
            self.pos = start;
            return Err(self.error(format!("expected pointer operand but found type '{}'", ty)));
        }
        self.parse_value(&ty)
    }

    fn parse_int_operand(&mut self) -> ParseResult<(Type, u32)> {
        let start = self.pos;
        let (ty, value) = self.parse_typed_value()?;
        if !ty.is_integer() {
            self.pos = start;
            return Err(self.error(format!("expected integer operand but found type '{}'", ty)));
        }
        Ok((ty, value))
    }

    fn parse_block_ref(&mut self) -> ParseResult<&'a str> {
        self.expect('^')?;
        self.read_name()
    }

    fn try_ordering(&mut self) -> Option<AtomicOrdering> {
        self.skip_whitespace();
        let saved = self.pos;
        match self.read_identifier() {
            Ok(name) => match AtomicOrdering::from_str(name) {
                Some(ordering) => Some(ordering),
                None => {
                    self.pos = saved;
                    None
                }
            },
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    /// Trailing `, align N`; 0 if absent.
    fn parse_align_suffix(&mut self) -> ParseResult<u32> {
        let mut align = 0;
        while self.try_read(',') {
            self.expect_keyword("align")?;
            align = self.read_u32()?;
            if !align.is_power_of_two() {
                return Err(self.error(format!("alignment {} is not a power of two", align)));
            }
        }
        Ok(align)
    }

    // ---------------------------------------------------------------------
    // Top level
    // ---------------------------------------------------------------------

    fn parse_target(&mut self) -> ParseResult<()> {
        self.expect_keyword("datalayout")?;
        self.expect('=')?;
        self.skip_whitespace();
        let start = self.pos;
        let spec = self.read_string()?;
        self.ir.data_layout = DataLayout::parse(spec).map_err(|source: LayoutError| {
            let (line, column) = self.location(start);
            ParseError::Layout {
                line,
                column,
                source,
            }
        })?;
        Ok(())
    }

    fn check_global_name(&self, name: &'a str, start: usize) -> ParseResult<()> {
        if self.globals.contains_key(name) || self.funcs.contains_key(name) {
            let (line, column) = self.location(start);
            return Err(ParseError::Redefinition {
                line,
                column,
                name: format!("@{}", name),
            });
        }
        Ok(())
    }

    fn parse_global(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.expect('@')?;
        let name = self.read_name()?;
        self.check_global_name(name, start)?;
        self.expect('=')?;
        self.expect_keyword("global")?;
        let value_type = self.parse_sized_type()?;
        let align = self.parse_align_suffix()?;

        let idx = self.push_value(name, Type::Ptr, ValueKind::Global { value_type, align });
        self.globals.insert(name, idx);
        Ok(())
    }

    fn parse_function(&mut self, declaration: bool) -> ParseResult<()> {
        self.skip_whitespace();
        let ret_type = if self.current_char() == Some('@') {
            Type::Void
        } else {
            self.parse_type()?
        };

        self.skip_whitespace();
        let start = self.pos;
        self.expect('@')?;
        let func_name = self.read_name()?;
        self.check_global_name(func_name, start)?;

        // Reset per-function state
        self.blocks.clear();
        self.values.clear();
        self.block_resolves.clear();

        // Parse parameters
        self.expect('(')?;
        let mut params = Vec::new();
        let mut args = Vec::new();
        if !self.try_read(')') {
            loop {
                let ty = self.parse_sized_type()?;
                if !declaration {
                    let mut align = 0;
                    if self.try_keyword("align") {
                        align = self.read_u32()?;
                    }
                    self.skip_whitespace();
                    let arg_start = self.pos;
                    self.expect('%')?;
                    let name = self.read_name()?;
                    if self.values.contains_key(name) {
                        let (line, column) = self.location(arg_start);
                        return Err(ParseError::Redefinition {
                            line,
                            column,
                            name: format!("%{}", name),
                        });
                    }
                    let idx = self.push_value(name, ty.clone(), ValueKind::Arg { align });
                    self.values.insert(name, idx);
                    args.push(idx);
                }
                params.push(ty);

                if self.try_read(')') {
                    break;
                }
                self.expect(',')?;
            }
        }

        let func_idx = self.ir.functions.len() as u32;
        let block_begin_idx = self.ir.blocks.len() as u32;

        if !declaration {
            self.expect('{')?;
            while !self.try_read('}') {
                if self.is_eof() {
                    return Err(self.error(format!(
                        "unexpected end of input in function '@{}'",
                        func_name
                    )));
                }
                self.parse_block()?;
            }
            self.resolve_blocks(func_name)?;
        }

        let block_end_idx = self.ir.blocks.len() as u32;
        self.funcs.insert(func_name, func_idx);
        self.ir.functions.push(Function {
            name: func_name.to_string(),
            declaration,
            ret_type,
            params,
            args,
            block_begin_idx,
            block_end_idx,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Blocks and instructions
    // ---------------------------------------------------------------------

    fn is_label_ahead(&mut self) -> bool {
        let saved = self.pos;
        let is_label = self.read_name_after_ws().is_ok() && {
            self.skip_blanks();
            self.current_char() == Some(':')
        };
        self.pos = saved;
        is_label
    }

    fn read_name_after_ws(&mut self) -> ParseResult<&'a str> {
        self.skip_whitespace();
        self.read_name()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.current_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    fn parse_block(&mut self) -> ParseResult<()> {
        self.skip_whitespace();
        let start = self.pos;
        let block_name = self.read_name()?;
        self.expect(':')?;

        if self.blocks.contains_key(block_name) {
            let (line, column) = self.location(start);
            return Err(ParseError::Redefinition {
                line,
                column,
                name: format!("^{}", block_name),
            });
        }

        let block_idx = self.ir.blocks.len() as u32;
        self.blocks.insert(block_name, block_idx);
        self.ir.blocks.push(Block {
            name: block_name.to_string(),
            insts: Vec::new(),
        });

        loop {
            self.skip_whitespace();
            if self.is_eof() || self.current_char() == Some('}') || self.is_label_ahead() {
                break;
            }
            let inst = self.parse_instruction()?;
            self.ir.blocks[block_idx as usize].insts.push(inst);
        }
        Ok(())
    }

    fn parse_instruction(&mut self) -> ParseResult<u32> {
        self.skip_whitespace();
        let start = self.pos;

        let result = if self.current_char() == Some('%') {
            self.advance();
            let name = self.read_name()?;
            self.expect('=')?;
            if self.values.contains_key(name) {
                let (line, column) = self.location(start);
                return Err(ParseError::Redefinition {
                    line,
                    column,
                    name: format!("%{}", name),
                });
            }
            Some(name)
        } else {
            None
        };

        let opcode_pos = {
            self.skip_whitespace();
            self.pos
        };
        let opcode = self.read_identifier()?;
        let mut callee = None;
        let mut block_refs = Vec::new();

        let op = match opcode {
            "alloca" => {
                let allocated = self.parse_sized_type()?;
                let align = self.parse_align_suffix()?;
                Operation::Alloca { allocated, align }
            }
            "load" => {
                let atomic = self.try_keyword("atomic");
                let volatile = self.try_keyword("volatile");
                let ty = self.parse_sized_type()?;
                self.expect(',')?;
                let ptr = self.parse_pointer()?;
                let ordering = if atomic { self.try_ordering() } else { None };
                let align = self.parse_align_suffix()?;
                Operation::Load { ty, ptr, align, ordering, atomic, volatile }
            }
            "store" => {
                let atomic = self.try_keyword("atomic");
                let volatile = self.try_keyword("volatile");
                let ty = self.parse_sized_type()?;
                let value = self.parse_value(&ty)?;
                self.expect(',')?;
                let ptr = self.parse_pointer()?;
                let ordering = if atomic { self.try_ordering() } else { None };
                let align = self.parse_align_suffix()?;
                Operation::Store { ty, value, ptr, align, ordering, atomic, volatile }
            }
            "memcpy" | "memmove" => {
                let kind = if opcode == "memcpy" {
                    MemTransferKind::Copy
                } else {
                    MemTransferKind::Move
                };
                let dest = self.parse_pointer()?;
                self.expect(',')?;
                let src = self.parse_pointer()?;
                self.expect(',')?;
                let (len_ty, len) = self.parse_int_operand()?;
                let align = self.parse_align_suffix()?;
                Operation::MemTransfer { kind, dest, src, len_ty, len, align }
            }
            "memset" => {
                let dest = self.parse_pointer()?;
                self.expect(',')?;
                self.skip_whitespace();
                let value_start = self.pos;
                let (value_ty, value) = self.parse_typed_value()?;
                if value_ty != Type::Int(8) {
                    self.pos = value_start;
                    return Err(self.error(format!("memset value must be i8, found '{}'", value_ty)));
                }
                self.expect(',')?;
                let (len_ty, len) = self.parse_int_operand()?;
                let align = self.parse_align_suffix()?;
                Operation::MemSet { dest, value, len_ty, len, align }
            }
            "cmpxchg" => {
                let volatile = self.try_keyword("volatile");
                let ptr = self.parse_pointer()?;
                self.expect(',')?;
                let (ty, cmp) = self.parse_typed_value()?;
                self.expect(',')?;
                let new_ty = self.parse_type()?;
                if new_ty != ty {
                    return Err(self.error(format!(
                        "cmpxchg operand types differ: '{}' and '{}'",
                        ty, new_ty
                    )));
                }
                let new = self.parse_value(&new_ty)?;
                let success = self.try_ordering();
                let failure = self.try_ordering();
                Operation::CmpXchg { ptr, ty, cmp, new, success, failure, volatile }
            }
            "atomicrmw" => {
                let volatile = self.try_keyword("volatile");
                let op_name = self.read_identifier()?;
                let op = RmwOp::from_str(op_name).ok_or_else(|| {
                    self.error(format!("unknown atomicrmw operation '{}'", op_name))
                })?;
                let ptr = self.parse_pointer()?;
                self.expect(',')?;
                let (ty, value) = self.parse_typed_value()?;
                let ordering = self.try_ordering();
                Operation::AtomicRmw { op, ptr, ty, value, ordering, volatile }
            }
            "icmp" => {
                let pred_name = self.read_identifier()?;
                let pred = IntPredicate::from_str(pred_name).ok_or_else(|| {
                    self.error(format!("unknown icmp predicate '{}'", pred_name))
                })?;
                let (ty, lhs) = self.parse_typed_value()?;
                self.expect(',')?;
                let rhs = self.parse_value(&ty)?;
                Operation::ICmp { pred, ty, lhs, rhs }
            }
            "call" => {
                self.skip_whitespace();
                let ret_type = if self.current_char() == Some('@') {
                    Type::Void
                } else {
                    self.parse_type()?
                };
                self.skip_whitespace();
                self.expect('@')?;
                let name = self.read_name()?;
                callee = Some(name);
                self.expect('(')?;
                let mut args = Vec::new();
                if !self.try_read(')') {
                    loop {
                        args.push(self.parse_typed_value()?);
                        if self.try_read(')') {
                            break;
                        }
                        self.expect(',')?;
                    }
                }
                Operation::Call { callee: 0, ret_type, args }
            }
            "br" => {
                block_refs.push(self.parse_block_ref()?);
                Operation::Br { target: 0 }
            }
            "condbr" => {
                let start = self.pos;
                let (ty, cond) = self.parse_typed_value()?;
                if ty != Type::Int(1) {
                    self.pos = start;
                    return Err(self.error(format!("condbr condition must be i1, found '{}'", ty)));
                }
                self.expect(',')?;
                block_refs.push(self.parse_block_ref()?);
                self.expect(',')?;
                block_refs.push(self.parse_block_ref()?);
                Operation::CondBr { cond, then_block: 0, else_block: 0 }
            }
            "ret" => {
                if self.at_line_end() {
                    Operation::Ret { value: None }
                } else {
                    Operation::Ret { value: Some(self.parse_typed_value()?) }
                }
            }
            "unreachable" => Operation::Unreachable,
            _ => match BinOp::from_str(opcode) {
                Some(op) => {
                    let (ty, lhs) = self.parse_int_operand()?;
                    self.expect(',')?;
                    let rhs = self.parse_value(&ty)?;
                    Operation::Binary { op, ty, lhs, rhs }
                }
                None => {
                    self.pos = opcode_pos;
                    return Err(self.error(format!("unknown instruction '{}'", opcode)));
                }
            },
        };

        let result_type = match &op {
            Operation::Alloca { .. } => Type::Ptr,
            Operation::Load { ty, .. }
            | Operation::AtomicRmw { ty, .. }
            | Operation::Binary { ty, .. } => ty.clone(),
            Operation::CmpXchg { ty, .. } => Type::Struct(vec![ty.clone(), Type::Int(1)]),
            Operation::ICmp { .. } => Type::Int(1),
            Operation::Call { ret_type, .. } => ret_type.clone(),
            _ => Type::Void,
        };

        let name = match result {
            Some(name) if result_type == Type::Void => {
                let (line, column) = self.location(start);
                return Err(ParseError::Syntax {
                    line,
                    column,
                    message: format!("'{}' does not produce a value to name '%{}'", opcode, name),
                });
            }
            Some(name) => name,
            None => "",
        };

        // Constant operands were pushed while parsing; the instruction lands after them.
        let idx = self.push_value(name, result_type, ValueKind::Inst(op));
        if !name.is_empty() {
            self.values.insert(name, idx);
        }
        if let Some(callee) = callee {
            self.func_resolves.push(Resolve {
                name: callee,
                index: idx,
                slot: 0,
            });
        }
        for (slot, block) in block_refs.into_iter().enumerate() {
            self.block_resolves.push(Resolve {
                name: block,
                index: idx,
                slot: slot as u8,
            });
        }
        Ok(idx)
    }

    // ---------------------------------------------------------------------
    // Reference resolution
    // ---------------------------------------------------------------------

    fn resolve_blocks(&mut self, func_name: &str) -> ParseResult<()> {
        for resolve in &self.block_resolves {
            let block = *self
                .blocks
                .get(resolve.name)
                .ok_or_else(|| ParseError::UndefinedBlock {
                    function: func_name.to_string(),
                    name: resolve.name.to_string(),
                })?;
            if let ValueKind::Inst(op) = &mut self.ir.values[resolve.index as usize].kind {
                match (op, resolve.slot) {
                    (Operation::Br { target }, _) => *target = block,
                    (Operation::CondBr { then_block, .. }, 0) => *then_block = block,
                    (Operation::CondBr { else_block, .. }, _) => *else_block = block,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn resolve_calls(&mut self) -> ParseResult<()> {
        for resolve in &self.func_resolves {
            let func = *self
                .funcs
                .get(resolve.name)
                .ok_or_else(|| ParseError::UndefinedFunction {
                    name: resolve.name.to_string(),
                })?;
            if let ValueKind::Inst(Operation::Call { callee, .. }) =
                &mut self.ir.values[resolve.index as usize].kind
            {
                *callee = func;
            }
        }
        Ok(())
    }
}
