use thiserror::Error;

use crate::analysis::ident::{IdentKind, UserTypeKind};

/// Errors found while analysing a syntactically valid description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("one or more prior definitions for `{name}` found, currently declared as a {existing}")]
    DuplicateDefinition { name: String, existing: IdentKind },
    #[error("identifier `{name}` is not defined")]
    UndefinedIdentifier { name: String },
    #[error("expecting identifier `{name}` to be a {expected}, got a {actual}")]
    WrongType {
        name: String,
        expected: IdentKind,
        actual: IdentKind,
    },
    #[error("identifier `{name}` is not defined, {expected} type expected")]
    UndefinedType { name: String, expected: UserTypeKind },
    #[error("identifier `{name}` is a {actual}, not a type")]
    NotAType { name: String, actual: IdentKind },
    #[error("type `{name}` is of kind {actual}, expecting {expected}")]
    WrongUserType {
        name: String,
        expected: UserTypeKind,
        actual: UserTypeKind,
    },
    #[error("parameter `{name}` required to parse {usage} not found")]
    ParameterMissing { name: String, usage: &'static str },
    #[error("to parse {usage}, `{name}` is required as a parameter, but it is defined as a {actual}")]
    ParameterWrongKind {
        name: String,
        usage: &'static str,
        actual: IdentKind,
    },
    #[error("parameter `{name}` is {value}, the maximum is {max}")]
    ParameterOutOfRange { name: String, value: u32, max: u32 },
    #[error("unable to order microcode bits in line {line}")]
    UnorderableLine { line: usize },
    #[error("command reads from bus `{bus}` before it was written in line {line}")]
    ReadBeforeWrite { line: usize, bus: String },
    #[error("header is already defined")]
    DuplicateHeader,
    #[error("number of lines in header ({lines}) is too high, the maximum is {max}")]
    HeaderTooLong { lines: usize, max: usize },
    #[error("opcode header does not contain enough bits, found {found}, expected {expected}")]
    HeaderTooSmall { found: u64, expected: u32 },
    #[error("opcode header contains too many bits, found {found}, expected {expected}")]
    HeaderTooLarge { found: u64, expected: u32 },
    #[error("number of lines in opcode ({lines}) is too high, the maximum is {max}")]
    TooManyLines { lines: usize, max: usize },
    #[error("parameter name `{name}` is used multiple times")]
    ParameterShadow { name: String },
    #[error("opcode {id:#b} is already defined")]
    OpcodeRedefined { id: usize },
    #[error("enum width {width} is too large, the maximum is {max}")]
    EnumTooWide { width: u32, max: u32 },
    #[error("not enough enum members, found {found}, expected {expected}")]
    EnumMoreMembers { expected: usize, found: usize },
    #[error("too many enum members, found {found}, expected {expected}")]
    EnumLessMembers { expected: usize, found: usize },
    #[error("enum member `{name}` is defined multiple times")]
    EnumDuplicateMember { name: String },
    #[error("variable `{name}` to substitute is not defined")]
    SubstitutionVariableUndefined { name: String },
    #[error("found undefined resultant identifier `{identifier}` while substituting into bitgroup")]
    SubstitutionUnresolved { identifier: String },
    #[error("resultant identifier `{identifier}` is a {actual}, expecting a vm control bit")]
    SubstitutionWrongType { identifier: String, actual: IdentKind },
    #[error("bitgroup `{name}` takes {expected} argument(s), found {found}")]
    BitGroupArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("could not resolve argument name `{name}`")]
    BitGroupArgumentUnresolved { name: String },
    #[error("argument `{name}` has type `{found}`, expecting `{expected}`")]
    BitGroupArgumentType {
        name: String,
        expected: String,
        found: String,
    },
}
