//! A minimal line-oriented assembly text format, kept deliberately outside
//! `tomasulo-core`: the engine consumes `DecodedInstruction`s from any
//! source, and this parser is just the one this binary happens to ship.
//!
//! One instruction or label per line, `#` starts a line comment. Supported
//! mnemonics: `add sub and or xor slt addi lw sw beq bne jal nop`. Registers
//! are written `x0`..`x31`. Branches and `jal` take a label, resolved to a
//! PC-relative immediate in a second pass.
//!
//! ```text
//! addi x1, x0, 10
//! loop:
//!     addi x1, x1, -1
//!     bne x1, x0, loop
//! ```

use std::collections::HashMap;
use std::fmt;

use tomasulo_core::isa::{DecodedInstruction, Opcode};
use tomasulo_core::program::ProgramStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for ParseError {}

struct RawLine {
    line_no: usize,
    text: String,
}

/// Parses `source` into a `ProgramStore`, one instruction every 4 bytes of
/// PC starting at 0.
///
/// # Errors
/// Returns the first malformed line, or a reference to an undefined label.
pub fn parse(source: &str) -> Result<ProgramStore, ParseError> {
    let lines = strip_comments_and_blanks(source);

    let mut labels = HashMap::new();
    let mut pc = 0u64;
    let mut instruction_lines = Vec::new();
    for raw in &lines {
        if let Some(name) = raw.text.strip_suffix(':') {
            let _ = labels.insert(name.trim().to_string(), pc);
        } else {
            instruction_lines.push((pc, raw));
            pc += 4;
        }
    }

    let mut store = ProgramStore::new();
    for (pc, raw) in instruction_lines {
        let inst = parse_instruction(pc, raw, &labels)?;
        store.insert(inst);
    }
    Ok(store)
}

fn strip_comments_and_blanks(source: &str) -> Vec<RawLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let stripped = line.split('#').next().unwrap_or("").trim();
            if stripped.is_empty() {
                None
            } else {
                Some(RawLine { line_no: i + 1, text: stripped.to_string() })
            }
        })
        .collect()
}

fn parse_instruction(pc: u64, raw: &RawLine, labels: &HashMap<String, u64>) -> Result<DecodedInstruction, ParseError> {
    let err = |reason: &str| ParseError { line: raw.line_no, reason: reason.to_string() };

    let (mnemonic, rest) = raw.text.split_once(char::is_whitespace).unwrap_or((raw.text.as_str(), ""));
    let operands: Vec<&str> = rest.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

    let reg = |field: &str| -> Result<u8, ParseError> { parse_register(field).ok_or_else(|| err(&format!("bad register '{field}'"))) };
    let imm = |field: &str| -> Result<i32, ParseError> { field.trim().parse().map_err(|_| err(&format!("bad immediate '{field}'"))) };

    let text = raw.text.clone();
    match mnemonic.to_lowercase().as_str() {
        "nop" => Ok(DecodedInstruction { pc, text, ..DecodedInstruction::nop(pc) }),
        "add" | "sub" | "and" | "or" | "xor" | "slt" => {
            let [rd, rs1, rs2] = require3(&operands).ok_or_else(|| err("expected 3 operands"))?;
            let opcode = match mnemonic.to_lowercase().as_str() {
                "add" => Opcode::Add,
                "sub" => Opcode::Sub,
                "and" => Opcode::And,
                "or" => Opcode::Or,
                "xor" => Opcode::Xor,
                _ => Opcode::Slt,
            };
            Ok(DecodedInstruction { pc, text, opcode, rd: reg(rd)?, rs1: reg(rs1)?, rs2: reg(rs2)?, imm: 0 })
        }
        "addi" => {
            let [rd, rs1, value] = require3(&operands).ok_or_else(|| err("expected 3 operands"))?;
            Ok(DecodedInstruction { pc, text, opcode: Opcode::Addi, rd: reg(rd)?, rs1: reg(rs1)?, rs2: 0, imm: imm(value)? })
        }
        "lw" => {
            let (rd, offset, base) = require_mem_operand(&operands).ok_or_else(|| err("expected 'rd, offset(rs1)'"))?;
            Ok(DecodedInstruction { pc, text, opcode: Opcode::Lw, rd: reg(rd)?, rs1: reg(base)?, rs2: 0, imm: imm(offset)? })
        }
        "sw" => {
            let (rs2, offset, base) = require_mem_operand(&operands).ok_or_else(|| err("expected 'rs2, offset(rs1)'"))?;
            Ok(DecodedInstruction { pc, text, opcode: Opcode::Sw, rd: 0, rs1: reg(base)?, rs2: reg(rs2)?, imm: imm(offset)? })
        }
        "beq" | "bne" => {
            let [rs1, rs2, label] = require3(&operands).ok_or_else(|| err("expected 'rs1, rs2, label'"))?;
            let target = resolve_label(label, labels).ok_or_else(|| err(&format!("undefined label '{label}'")))?;
            let opcode = if mnemonic.eq_ignore_ascii_case("beq") { Opcode::Beq } else { Opcode::Bne };
            Ok(DecodedInstruction { pc, text, opcode, rd: 0, rs1: reg(rs1)?, rs2: reg(rs2)?, imm: (target as i64 - pc as i64) as i32 })
        }
        "jal" => {
            let label = operands.first().ok_or_else(|| err("expected a label"))?;
            let target = resolve_label(label, labels).ok_or_else(|| err(&format!("undefined label '{label}'")))?;
            Ok(DecodedInstruction { pc, text, opcode: Opcode::Jal, rd: 0, rs1: 0, rs2: 0, imm: (target as i64 - pc as i64) as i32 })
        }
        other => Err(err(&format!("unknown mnemonic '{other}'"))),
    }
}

fn require3<'a>(operands: &[&'a str]) -> Option<[&'a str; 3]> {
    if operands.len() == 3 {
        Some([operands[0], operands[1], operands[2]])
    } else {
        None
    }
}

/// Parses `offset(rs1)` from a two-operand `rd, offset(rs1)` memory form.
fn require_mem_operand<'a>(operands: &[&'a str]) -> Option<(&'a str, &'a str, &'a str)> {
    if operands.len() != 2 {
        return None;
    }
    let (offset, base) = operands[1].split_once('(')?;
    let base = base.strip_suffix(')')?;
    Some((operands[0], offset, base))
}

fn resolve_label(label: &str, labels: &HashMap<String, u64>) -> Option<u64> {
    labels.get(label).copied()
}

fn parse_register(field: &str) -> Option<u8> {
    field.strip_prefix('x')?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_straight_line_arithmetic() {
        let store = parse("addi x1, x0, 5\nadd x2, x1, x1\n").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().opcode, Opcode::Addi);
        assert_eq!(store.get(4).unwrap().opcode, Opcode::Add);
    }

    #[test]
    fn resolves_forward_and_backward_labels() {
        let src = "loop:\n    addi x1, x1, -1\n    bne x1, x0, loop\n";
        let store = parse(src).unwrap();
        let branch = store.get(4).unwrap();
        assert_eq!(branch.opcode, Opcode::Bne);
        assert_eq!(branch.imm, -4); // branches back to pc 0
    }

    #[test]
    fn parses_memory_operand_syntax() {
        let store = parse("lw x3, 8(x1)\nsw x3, 8(x1)\n").unwrap();
        let lw = store.get(0).unwrap();
        assert_eq!(lw.opcode, Opcode::Lw);
        assert_eq!(lw.rd, 3);
        assert_eq!(lw.rs1, 1);
        assert_eq!(lw.imm, 8);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let store = parse("# a comment\n\naddi x1, x0, 1 # trailing comment\n").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_mnemonic_is_reported_with_its_line_number() {
        let err = parse("addi x1, x0, 1\nfrobnicate x1\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.reason.contains("frobnicate"));
    }

    #[test]
    fn undefined_label_is_an_error() {
        let err = parse("beq x1, x0, nowhere\n").unwrap_err();
        assert!(err.reason.contains("nowhere"));
    }
}
