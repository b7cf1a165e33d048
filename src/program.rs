//! Result of a successful analysis: scheduled command lists for the fetch
//! header and for every concrete opcode.

use std::fmt::Display;

use crate::{
    ast::Span,
    hardware::{CommandId, CoreModel},
};

/// One scheduled microcode line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProgramLine {
    pub low: Vec<CommandId>,
    /// `None` when the line has no condition
    pub high: Option<Vec<CommandId>>,
}

impl ProgramLine {
    pub fn has_condition(&self) -> bool {
        self.high.is_some()
    }

    /// Commands run when the condition is set. Without a condition this is
    /// the low list.
    pub fn high(&self) -> &[CommandId] {
        self.high.as_deref().unwrap_or(&self.low)
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OpcodeRecord {
    pub name: String,
    /// span of the opcode name in the source
    pub definition: Span,
    pub lines: Vec<ProgramLine>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Program {
    /// fetch sequence run before every opcode
    pub head: Vec<CommandId>,
    opcodes: Vec<Option<OpcodeRecord>>,
}

impl Program {
    /// The dispatch table, `2^opsize` entries once any opcode was analysed.
    pub fn opcodes(&self) -> &[Option<OpcodeRecord>] {
        &self.opcodes
    }

    pub fn opcode(&self, id: usize) -> Option<&OpcodeRecord> {
        self.opcodes.get(id).and_then(Option::as_ref)
    }

    pub fn defined_opcodes(&self) -> impl Iterator<Item = (usize, &OpcodeRecord)> {
        self.opcodes
            .iter()
            .enumerate()
            .filter_map(|(id, op)| op.as_ref().map(|op| (id, op)))
    }

    /// Width of an opcode id in bits.
    pub fn opsize(&self) -> u32 {
        self.opcodes.len().max(1).trailing_zeros()
    }

    pub(crate) fn ensure_opcode_table(&mut self, opsize: u32) {
        if self.opcodes.is_empty() {
            self.opcodes.resize_with(1 << opsize, || None);
        }
    }

    pub(crate) fn set_opcode(&mut self, id: usize, record: OpcodeRecord) {
        let len = self.opcodes.len();
        match self.opcodes.get_mut(id) {
            Some(slot) => *slot = Some(record),
            None => panic!("opcode id {} outside of a table of {} entries", id, len),
        }
    }
}

/// Human readable dump of a program, commands shown by name.
pub struct ProgramListing<'a> {
    pub core: &'a CoreModel,
    pub program: &'a Program,
}

impl ProgramListing<'_> {
    fn write_commands(&self, f: &mut std::fmt::Formatter<'_>, ids: &[CommandId]) -> std::fmt::Result {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.core.command(*id).name)?;
        }
        Ok(())
    }
}

impl Display for ProgramListing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "header:")?;
        if !self.program.head.is_empty() {
            write!(f, "    ")?;
            self.write_commands(f, &self.program.head)?;
            writeln!(f)?;
        }
        let width = self.program.opsize() as usize + 2;
        for (id, op) in self.program.defined_opcodes() {
            writeln!(f, "opcode {:#0width$b} {}:", id, op.name, width = width)?;
            for line in &op.lines {
                write!(f, "    ")?;
                match &line.high {
                    Some(high) => {
                        write!(f, "? ")?;
                        self.write_commands(f, high)?;
                        write!(f, " : ")?;
                        self.write_commands(f, &line.low)?;
                    }
                    None => self.write_commands(f, &line.low)?,
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_defaults_to_low() {
        let line = ProgramLine {
            low: vec![1, 2],
            high: None,
        };
        assert_eq!(line.high(), &[1, 2]);
        let line = ProgramLine {
            low: vec![1],
            high: Some(vec![3]),
        };
        assert_eq!(line.high(), &[3]);
        assert!(line.has_condition());
    }

    #[test]
    fn test_opcode_table() {
        let mut program = Program::default();
        assert_eq!(program.opcodes().len(), 0);
        program.ensure_opcode_table(3);
        program.ensure_opcode_table(5);
        assert_eq!(program.opcodes().len(), 8);
        assert_eq!(program.opsize(), 3);
        program.set_opcode(
            6,
            OpcodeRecord {
                name: "add".into(),
                definition: Span::default(),
                lines: vec![],
            },
        );
        let ids: Vec<_> = program.defined_opcodes().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![6]);
        assert!(program.opcode(7).is_none());
    }
}
