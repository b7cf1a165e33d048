//! This module provides parsing utilities for microcode descriptions.
use pest::{
    error::InputLocation,
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::{
    ast::*,
    diagnostic::{Diagnostic, Diagnostics},
};

#[derive(Parser)]
#[grammar = "src/grammar.pest"] // relative to project root
pub struct MicrocodeParser;

/// Parse a microcode description. Statements that fail to parse are
/// recovered from and reported as syntax diagnostics.
pub fn parse(src: &str) -> (Ast, Diagnostics) {
    let mut builder = AstBuilder {
        src,
        diagnostics: Diagnostics::default(),
        valid: true,
    };
    let statements = match MicrocodeParser::parse(Rule::main, src) {
        Ok(mut pairs) => pairs
            .next()
            .map(|main| {
                main.into_inner()
                    .filter_map(|pair| builder.statement(pair))
                    .collect()
            })
            .unwrap_or_default(),
        Err(err) => {
            builder.pest_error(0, err);
            Vec::new()
        }
    };
    tracing::debug!(statements = statements.len(), "parsed");
    (Ast { statements }, builder.diagnostics)
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::identifier => "identifier",
        Rule::number => "number",
        Rule::binary => "binary opcode id",
        Rule::kw_header => "`header`",
        Rule::kw_opcode => "`opcode`",
        Rule::kw_type => "`type`",
        Rule::kw_enum => "`enum`",
        Rule::kw_bitgroup => "`bitgroup`",
        Rule::parameter => "parameter",
        Rule::header => "header",
        Rule::opcode => "opcode",
        Rule::type_def => "type definition",
        Rule::bitgroup => "bitgroup",
        Rule::params => "parameter list",
        Rule::param => "`name: Type`",
        Rule::segments => "bitgroup template",
        Rule::substitution => "`[param]`",
        Rule::literal => "template literal",
        Rule::block => "block",
        Rule::line => "line",
        Rule::conditional => "conditional line",
        Rule::bits => "bit list",
        Rule::bit => "bit",
        Rule::EOI => "end of input",
        other => return format!("{:?}", other),
    }
    .to_string()
}

fn child<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Pair<'i, Rule> {
    pairs
        .next()
        .unwrap_or_else(|| panic!("grammar always yields {what} here"))
}

fn to_name(pair: Pair<'_, Rule>) -> Name {
    Token::new(pair.as_str().to_string(), Span::from_pest(pair.as_span()))
}

struct AstBuilder<'s> {
    src: &'s str,
    diagnostics: Diagnostics,
    /// validity of the statement being built
    valid: bool,
}

impl AstBuilder<'_> {
    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.valid = false;
        self.diagnostics.push(Diagnostic::syntax(span, message));
    }

    fn span_at(&self, offset: usize) -> Span {
        let len = usize::from(offset < self.src.len());
        match pest::Position::new(self.src, offset) {
            Some(pos) => {
                let (line, column) = pos.line_col();
                Span {
                    offset,
                    len,
                    line,
                    column,
                }
            }
            None => Span {
                offset,
                len,
                ..Span::default()
            },
        }
    }

    fn pest_error(&mut self, base: usize, err: pest::error::Error<Rule>) {
        let err = err.renamed_rules(rule_name);
        let pos = match err.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        let span = self.span_at(base + pos);
        self.error(span, err.variant.message().into_owned());
    }

    fn statement(&mut self, pair: Pair<'_, Rule>) -> Option<Statement> {
        self.valid = true;
        let span = Span::from_pest(pair.as_span());
        let kind = match pair.as_rule() {
            Rule::parameter => StatementKind::Parameter(self.parameter(pair)),
            Rule::header => StatementKind::Header(self.header(pair)),
            Rule::opcode => StatementKind::Opcode(self.opcode(pair)),
            Rule::type_def => StatementKind::Type(self.type_def(pair)),
            Rule::bitgroup => StatementKind::BitGroup(self.bitgroup(pair)),
            Rule::unparsed => {
                self.unparsed(pair);
                StatementKind::Unparsed
            }
            Rule::EOI => return None,
            rule => unreachable!("unexpected top level rule {:?}", rule),
        };
        Some(Statement {
            kind,
            span,
            valid: self.valid,
        })
    }

    /// Re-parse the skipped text as a single statement to find out where
    /// and why it is malformed.
    fn unparsed(&mut self, pair: Pair<'_, Rule>) {
        let base = pair.as_span().start();
        match MicrocodeParser::parse(Rule::single, pair.as_str()) {
            Err(err) => self.pest_error(base, err),
            Ok(_) => {
                let span = Span::from_pest(pair.as_span());
                self.error(span, "unable to parse statement")
            }
        }
    }

    fn number(&mut self, pair: Pair<'_, Rule>) -> Token<u32> {
        let span = Span::from_pest(pair.as_span());
        let text = pair.as_str();
        let parsed = if let Some(hex) = text.strip_prefix("0x") {
            u32::from_str_radix(hex, 16)
        } else if let Some(bin) = text.strip_prefix("0b") {
            u32::from_str_radix(bin, 2)
        } else {
            text.parse()
        };
        match parsed {
            Ok(value) => Token::new(value, span),
            Err(_) => {
                self.error(span, format!("number `{}` does not fit in 32 bits", text));
                Token::new(0, span)
            }
        }
    }

    fn parameter(&mut self, pair: Pair<'_, Rule>) -> ParameterDef {
        let mut inner = pair.into_inner();
        let name = to_name(child(&mut inner, "parameter name"));
        let value = self.number(child(&mut inner, "parameter value"));
        ParameterDef { name, value }
    }

    fn header(&mut self, pair: Pair<'_, Rule>) -> Header {
        let mut inner = pair.into_inner();
        let keyword = Span::from_pest(child(&mut inner, "keyword").as_span());
        let lines = self.block(child(&mut inner, "header block"));
        for line in &lines {
            if line.has_condition() {
                self.error(line.span, "conditions are not allowed in the header");
            }
        }
        Header { keyword, lines }
    }

    fn opcode(&mut self, pair: Pair<'_, Rule>) -> Opcode {
        let mut inner = pair.into_inner();
        child(&mut inner, "keyword");
        let id_pair = child(&mut inner, "opcode id");
        let digits = &id_pair.as_str()[2..];
        let id_span = Span::from_pest(id_pair.as_span());
        let id = OpcodeId {
            value: self.number(id_pair).value,
            bits: digits.len() as u32,
            span: id_span,
        };
        let name = to_name(child(&mut inner, "opcode name"));
        let mut params = Vec::new();
        let mut lines = Vec::new();
        for pair in inner {
            match pair.as_rule() {
                Rule::params => params = self.params(pair),
                Rule::block => lines = self.block(pair),
                rule => unreachable!("unexpected rule {:?} in opcode", rule),
            }
        }
        Opcode {
            id,
            name,
            params,
            lines,
        }
    }

    fn type_def(&mut self, pair: Pair<'_, Rule>) -> TypeDef {
        let mut inner = pair.into_inner();
        child(&mut inner, "keyword");
        let name = to_name(child(&mut inner, "type name"));
        let mut body = child(&mut inner, "enum body").into_inner();
        child(&mut body, "keyword");
        let width = self.number(child(&mut body, "enum width"));
        let members = body.map(to_name).collect();
        TypeDef {
            name,
            body: TypeBody::Enum(EnumDef { width, members }),
        }
    }

    fn bitgroup(&mut self, pair: Pair<'_, Rule>) -> BitGroupDef {
        let mut inner = pair.into_inner();
        child(&mut inner, "keyword");
        let name = to_name(child(&mut inner, "bitgroup name"));
        let mut params = Vec::new();
        let mut segments = Vec::new();
        for pair in inner {
            match pair.as_rule() {
                Rule::params => params = self.params(pair),
                Rule::segments => {
                    segments = pair
                        .into_inner()
                        .map(|seg| match seg.as_rule() {
                            Rule::substitution => Segment::Substitution(to_name(child(
                                &mut seg.into_inner(),
                                "substituted name",
                            ))),
                            _ => Segment::Literal(to_name(seg)),
                        })
                        .collect()
                }
                rule => unreachable!("unexpected rule {:?} in bitgroup", rule),
            }
        }
        BitGroupDef {
            name,
            params,
            segments,
        }
    }

    fn params(&mut self, pair: Pair<'_, Rule>) -> Vec<Param> {
        pair.into_inner()
            .map(|param| {
                let mut inner = param.into_inner();
                let name = to_name(child(&mut inner, "parameter name"));
                let ty = to_name(child(&mut inner, "parameter type"));
                Param { name, ty }
            })
            .collect()
    }

    fn block(&mut self, pair: Pair<'_, Rule>) -> Vec<Line> {
        pair.into_inner()
            .map(|line| {
                let span = Span::from_pest(line.as_span());
                let body = child(&mut line.into_inner(), "line body");
                match body.as_rule() {
                    Rule::conditional => {
                        let mut inner = body.into_inner();
                        let high = bits(child(&mut inner, "high bits"));
                        let low = bits(child(&mut inner, "low bits"));
                        Line {
                            low,
                            high: Some(high),
                            span,
                        }
                    }
                    _ => Line {
                        low: bits(body),
                        high: None,
                        span,
                    },
                }
            })
            .collect()
    }
}

fn bits(pair: Pair<'_, Rule>) -> Vec<Bit> {
    pair.into_inner()
        .map(|bit| {
            let mut inner = bit.into_inner();
            let name = to_name(child(&mut inner, "bit name"));
            Bit {
                name,
                args: inner.map(to_name).collect(),
            }
        })
        .collect()
}
