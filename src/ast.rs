//! Syntax tree of a microcode description, produced by [`crate::parse`].

use std::fmt::Display;

/// Source range of a token or statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Span {
    /// byte offset into the source
    pub offset: usize,
    /// length in bytes
    pub len: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl Span {
    pub(crate) fn from_pest(span: pest::Span<'_>) -> Self {
        let (line, column) = span.start_pos().line_col();
        Self {
            offset: span.start(),
            len: span.end() - span.start(),
            line,
            column,
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A lexical token with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Token<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

pub type Name = Token<String>;

impl Name {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
    /// false when the parser reported an error inside this statement
    pub valid: bool,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Parameter(ParameterDef),
    Header(Header),
    Opcode(Opcode),
    Type(TypeDef),
    BitGroup(BitGroupDef),
    /// Text skipped by error recovery.
    Unparsed,
}

/// `name = value;`
#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub name: Name,
    pub value: Token<u32>,
}

/// `header { lines }`
#[derive(Debug, Clone)]
pub struct Header {
    /// the `header` keyword, where header-wide errors point to
    pub keyword: Span,
    pub lines: Vec<Line>,
}

/// Binary opcode id such as `0b0110`.
#[derive(Debug, Clone)]
pub struct OpcodeId {
    pub value: u32,
    /// number of binary digits written, leading zeros included
    pub bits: u32,
    pub span: Span,
}

/// `opcode 0b01 name(param: Type, ..) { lines }`
#[derive(Debug, Clone)]
pub struct Opcode {
    pub id: OpcodeId,
    pub name: Name,
    pub params: Vec<Param>,
    pub lines: Vec<Line>,
}

/// `name: Type`
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Name,
    pub ty: Name,
}

/// One microcode line. With a condition the line reads `? high : low;`.
#[derive(Debug, Clone)]
pub struct Line {
    pub low: Vec<Bit>,
    pub high: Option<Vec<Bit>>,
    pub span: Span,
}

impl Line {
    pub fn has_condition(&self) -> bool {
        self.high.is_some()
    }
}

/// A control bit, or a bit-group reference with arguments.
#[derive(Debug, Clone)]
pub struct Bit {
    pub name: Name,
    pub args: Vec<Name>,
}

/// `type Name = enum(width) { members };`
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: Name,
    pub body: TypeBody,
}

#[derive(Debug, Clone)]
pub enum TypeBody {
    Enum(EnumDef),
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub width: Token<u32>,
    pub members: Vec<Name>,
}

/// `bitgroup name(param: Type, ..) = segments;`
#[derive(Debug, Clone)]
pub struct BitGroupDef {
    pub name: Name,
    pub params: Vec<Param>,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(Name),
    /// `[param]`
    Substitution(Name),
}
