//! Semantic analysis: type checks every statement against the identifier
//! table and the hardware model, schedules microcode lines and expands
//! parameterised opcodes into the dispatch table.

mod definitions;
pub mod expand;
pub mod graph;
pub mod ident;
pub mod line;
mod microcode;

use std::collections::BTreeSet;

use crate::{
    ast::{Ast, Span, StatementKind},
    diagnostic::{Diagnostic, Diagnostics},
    error::SemanticError,
    hardware::CoreModel,
    program::Program,
};
use ident::{IdentTable, Identifier};
#[cfg(test)]
use ident::BitGroup as BitGroupIdent;

/// Largest accepted value of `phase` and `opsize`, and of an enum width.
pub const MAX_WIDTH: u32 = 16;

#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub diagnostics: Diagnostics,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Analyse a parsed description against `core`.
pub fn analyse(ast: &Ast, core: &CoreModel) -> Analysis {
    Analyser::new(core).run(ast)
}

#[derive(Debug, Clone, Copy)]
struct HeaderInfo {
    keyword: Span,
    lines: usize,
}

/// State of one analysis run.
pub(crate) struct Analyser<'a> {
    core: &'a CoreModel,
    idents: IdentTable,
    program: Program,
    diagnostics: Diagnostics,
    header: Option<HeaderInfo>,
    /// parameters already reported as missing or malformed
    errored_parameters: BTreeSet<String>,
}

impl<'a> Analyser<'a> {
    pub fn new(core: &'a CoreModel) -> Self {
        let mut idents = IdentTable::default();
        for (id, cmd) in core.commands().iter().enumerate() {
            if let Err(err) = idents.define(&cmd.name, Identifier::ControlBit(id)) {
                panic!("inconsistent hardware model: {}", err)
            }
        }
        Self {
            core,
            idents,
            program: Program::default(),
            diagnostics: Diagnostics::default(),
            header: None,
            errored_parameters: BTreeSet::new(),
        }
    }

    pub fn run(mut self, ast: &Ast) -> Analysis {
        self.visit(ast);
        tracing::info!(
            identifiers = self.idents.len(),
            opcodes = self.program.defined_opcodes().count(),
            errors = self.diagnostics.len(),
            "analysis finished"
        );
        Analysis {
            program: self.program,
            diagnostics: self.diagnostics,
        }
    }

    /// Analyse every valid statement, top to bottom.
    fn visit(&mut self, ast: &Ast) {
        for stmt in &ast.statements {
            if !stmt.valid {
                tracing::trace!(at = %stmt.span, "skip invalid statement");
                continue;
            }
            match &stmt.kind {
                StatementKind::Parameter(def) => self.analyse_parameter(def),
                StatementKind::Header(header) => self.analyse_header(header),
                StatementKind::Opcode(opcode) => self.analyse_opcode(opcode),
                StatementKind::Type(def) => self.analyse_type(def),
                StatementKind::BitGroup(def) => self.analyse_bitgroup(def),
                StatementKind::Unparsed => {}
            }
        }
    }

    fn error(&mut self, span: Span, err: SemanticError) {
        self.diagnostics.push(Diagnostic::semantic(span, err));
    }

    /// Value of the parameter `name` needed to analyse `usage`. Problems are
    /// reported once per parameter name.
    fn parameter(&mut self, name: &str, usage: &'static str, at: Span) -> Option<u32> {
        let found = self.idents.get(name).map(|ident| match ident {
            Identifier::Parameter { value, .. } => Ok(*value),
            other => Err(other.kind()),
        });
        let err = match found {
            Some(Ok(value)) if value <= MAX_WIDTH => return Some(value),
            Some(Ok(value)) => SemanticError::ParameterOutOfRange {
                name: name.to_string(),
                value,
                max: MAX_WIDTH,
            },
            Some(Err(actual)) => SemanticError::ParameterWrongKind {
                name: name.to_string(),
                usage,
                actual,
            },
            None => SemanticError::ParameterMissing {
                name: name.to_string(),
                usage,
            },
        };
        if self.errored_parameters.insert(name.to_string()) {
            self.error(at, err);
        }
        None
    }
}
