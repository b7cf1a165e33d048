//! Header and opcode statements.

use std::collections::BTreeSet;

use super::{
    expand::{full_factorial, row_index},
    ident::{IdentKind, Identifier, UserTypeKind},
    line::{self, LineError},
    Analyser, HeaderInfo,
};
use crate::{
    ast::{Bit, Header, Line, Opcode},
    diagnostic::Diagnostic,
    error::SemanticError,
    hardware::CommandId,
    program::{OpcodeRecord, ProgramLine},
};

/// Opcode parameter visible to the bits of its lines.
struct ScopeParam {
    name: String,
    ty: String,
    width: u32,
    member_count: usize,
}

/// A type checked bit, ready to be resolved for any opcode variant.
enum CheckedBit {
    Control(CommandId),
    Group {
        /// bit-group expansion table
        commands: Vec<CommandId>,
        levels: Vec<usize>,
        /// opcode parameter index of each argument
        args: Vec<usize>,
    },
}

fn resolve(bits: &[CheckedBit], row: &[usize]) -> Vec<CommandId> {
    bits.iter()
        .map(|bit| match bit {
            CheckedBit::Control(id) => *id,
            CheckedBit::Group {
                commands,
                levels,
                args,
            } => {
                let indices: Vec<usize> = args.iter().map(|&i| row[i]).collect();
                commands[row_index(levels, &indices)]
            }
        })
        .collect()
}

impl Analyser<'_> {
    /// Type check the bits of a line. `None` if any bit is unusable; errors
    /// are reported except for references to failed bit-groups.
    fn check_bits(&mut self, bits: &[Bit], scope: &[ScopeParam]) -> Option<Vec<CheckedBit>> {
        let mut errors = Vec::new();
        let mut silent = false;
        let mut checked = Vec::new();

        for bit in bits {
            let name = bit.name.as_str();
            match self.idents.get(name) {
                None => errors.push((
                    bit.name.span,
                    SemanticError::UndefinedIdentifier { name: name.into() },
                )),
                Some(Identifier::ControlBit(id)) => {
                    if bit.args.is_empty() {
                        checked.push(CheckedBit::Control(*id));
                    } else {
                        errors.push((
                            bit.name.span,
                            SemanticError::WrongType {
                                name: name.into(),
                                expected: IdentKind::BitGroup,
                                actual: IdentKind::ControlBit,
                            },
                        ));
                    }
                }
                Some(Identifier::BitGroup(group)) => {
                    let Some(table) = &group.table else {
                        silent = true;
                        continue;
                    };
                    if bit.args.len() != group.params.len() {
                        errors.push((
                            bit.name.span,
                            SemanticError::BitGroupArgumentCount {
                                name: name.into(),
                                expected: group.params.len(),
                                found: bit.args.len(),
                            },
                        ));
                        continue;
                    }
                    let mut args = Vec::new();
                    for (arg, param) in bit.args.iter().zip(&group.params) {
                        match scope.iter().position(|p| p.name == arg.value) {
                            None => errors.push((
                                arg.span,
                                SemanticError::BitGroupArgumentUnresolved {
                                    name: arg.value.clone(),
                                },
                            )),
                            Some(i) if scope[i].ty != param.ty => errors.push((
                                arg.span,
                                SemanticError::BitGroupArgumentType {
                                    name: arg.value.clone(),
                                    expected: param.ty.clone(),
                                    found: scope[i].ty.clone(),
                                },
                            )),
                            Some(i) => args.push(i),
                        }
                    }
                    checked.push(CheckedBit::Group {
                        commands: table.iter().map(|s| s.command).collect(),
                        levels: group.levels(),
                        args,
                    });
                }
                Some(other) => errors.push((
                    bit.name.span,
                    SemanticError::WrongType {
                        name: name.into(),
                        expected: IdentKind::ControlBit,
                        actual: other.kind(),
                    },
                )),
            }
        }

        let passed = errors.is_empty() && !silent;
        for (span, err) in errors {
            self.error(span, err);
        }
        passed.then_some(checked)
    }

    /// Schedule one concrete line. `number` is 1-based within its block.
    fn schedule_line(
        &mut self,
        commands: &[CommandId],
        line: &Line,
        number: usize,
        reported: &mut Vec<SemanticError>,
    ) -> Option<Vec<CommandId>> {
        let err = match line::schedule(self.core, commands) {
            Ok(order) => {
                tracing::debug!(line = number, commands = order.len(), "line scheduled");
                for &id in &order {
                    tracing::trace!(command = %self.core.command(id).name, line = number, "emitting");
                }
                return Some(order);
            }
            Err(LineError::Unorderable) => SemanticError::UnorderableLine { line: number },
            Err(LineError::ReadBeforeWrite(bus)) => SemanticError::ReadBeforeWrite {
                line: number,
                bus: self.core.component(bus).name.clone(),
            },
        };
        // variants of one opcode share their source lines
        if !reported.contains(&err) {
            reported.push(err.clone());
            self.error(line.span, err);
        }
        None
    }

    pub(super) fn analyse_header(&mut self, header: &Header) {
        tracing::info!(at = %header.keyword, "analysing header");
        if let Some(first) = self.header {
            self.diagnostics.push(
                Diagnostic::semantic(header.keyword, SemanticError::DuplicateHeader)
                    .with_note("header first included here", first.keyword),
            );
            return;
        }
        self.header = Some(HeaderInfo {
            keyword: header.keyword,
            lines: header.lines.len(),
        });

        let Some(phase) = self.parameter("phase", "header", header.keyword) else {
            return;
        };
        let max = 1usize << phase;
        if header.lines.len() > max {
            self.error(
                header.keyword,
                SemanticError::HeaderTooLong {
                    lines: header.lines.len(),
                    max,
                },
            );
        }

        let mut reported = Vec::new();
        for (i, line) in header.lines.iter().enumerate() {
            let Some(bits) = self.check_bits(&line.low, &[]) else {
                continue;
            };
            let commands = resolve(&bits, &[]);
            if let Some(order) = self.schedule_line(&commands, line, i + 1, &mut reported) {
                self.program.head.extend(order);
            }
        }
    }

    pub(super) fn analyse_opcode(&mut self, opcode: &Opcode) {
        let Some(header) = self.header else {
            tracing::debug!(name = %opcode.name.value, "no header yet, opcode skipped");
            return;
        };
        tracing::info!(name = %opcode.name.value, "analysing opcode");

        let phase = self.parameter("phase", "opcode", opcode.name.span);
        let opsize = self.parameter("opsize", "opcode", opcode.name.span);
        let (Some(phase), Some(opsize)) = (phase, opsize) else {
            return;
        };
        let max_lines = (1usize << phase).saturating_sub(header.lines);
        self.program.ensure_opcode_table(opsize);

        let mut passed = true;
        let mut scope: Vec<ScopeParam> = Vec::new();
        let mut names = BTreeSet::new();
        for param in &opcode.params {
            let ty = match self
                .idents
                .require_user_type(param.ty.as_str(), UserTypeKind::Any)
            {
                Ok(ty) => Some((ty.bit_width(), ty.member_count())),
                Err(err) => {
                    self.error(param.ty.span, err);
                    passed = false;
                    None
                }
            };
            if !names.insert(param.name.as_str()) {
                self.error(
                    param.name.span,
                    SemanticError::ParameterShadow {
                        name: param.name.value.clone(),
                    },
                );
                passed = false;
                continue;
            }
            if let Some((width, member_count)) = ty {
                scope.push(ScopeParam {
                    name: param.name.value.clone(),
                    ty: param.ty.value.clone(),
                    width,
                    member_count,
                });
            }
        }
        if !passed {
            return;
        }

        // enums wider than MAX_WIDTH are still defined, sum without wrapping
        let found = scope
            .iter()
            .map(|p| u64::from(p.width))
            .sum::<u64>()
            + u64::from(opcode.id.bits);
        if found != u64::from(opsize) {
            let err = if found < u64::from(opsize) {
                SemanticError::HeaderTooSmall {
                    found,
                    expected: opsize,
                }
            } else {
                SemanticError::HeaderTooLarge {
                    found,
                    expected: opsize,
                }
            };
            self.error(opcode.id.span, err);
            return;
        }
        let param_width = opsize - opcode.id.bits;

        if opcode.lines.len() > max_lines {
            self.error(
                opcode.name.span,
                SemanticError::TooManyLines {
                    lines: opcode.lines.len(),
                    max: max_lines,
                },
            );
            return;
        }

        let mut checked_lines = Vec::new();
        for line in &opcode.lines {
            let low = self.check_bits(&line.low, &scope);
            let high = match &line.high {
                Some(high) => self.check_bits(high, &scope).map(Some),
                None => Some(None),
            };
            match (low, high) {
                (Some(low), Some(high)) => checked_lines.push((line, low, high)),
                _ => passed = false,
            }
        }
        if !passed {
            return;
        }

        let levels: Vec<usize> = scope.iter().map(|p| p.member_count).collect();
        let rows = full_factorial(&levels);
        if rows.len() != 1 << param_width {
            // an enum with the wrong member count, already reported
            return;
        }
        let base = (opcode.id.value as usize) << param_width;
        if let Some((id, first)) = (base..base + rows.len())
            .find_map(|id| self.program.opcode(id).map(|op| (id, op.definition)))
        {
            self.diagnostics.push(
                Diagnostic::semantic(opcode.name.span, SemanticError::OpcodeRedefined { id })
                    .with_note("previously defined here", first),
            );
            return;
        }

        let mut reported = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            let mut lines = Vec::with_capacity(checked_lines.len());
            for (i, (line, low, high)) in checked_lines.iter().enumerate() {
                let low = self
                    .schedule_line(&resolve(low, row), line, i + 1, &mut reported)
                    .unwrap_or_default();
                let high = high.as_ref().map(|high| {
                    self.schedule_line(&resolve(high, row), line, i + 1, &mut reported)
                        .unwrap_or_default()
                });
                lines.push(ProgramLine { low, high });
            }
            tracing::debug!(id = base + r, name = %opcode.name.value, "opcode variant");
            self.program.set_opcode(
                base + r,
                OpcodeRecord {
                    name: opcode.name.value.clone(),
                    definition: opcode.name.span,
                    lines,
                },
            );
        }
    }
}
