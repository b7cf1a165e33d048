//! The single namespace shared by parameters, control bits, user types and
//! bit-groups.

use std::{collections::BTreeMap, fmt::Display};

use crate::{
    ast::{Name, Span},
    error::SemanticError,
    hardware::CommandId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Parameter,
    ControlBit,
    UserType,
    BitGroup,
}

impl Display for IdentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IdentKind::Parameter => "parameter",
            IdentKind::ControlBit => "vm control bit",
            IdentKind::UserType => "user type",
            IdentKind::BitGroup => "bitgroup",
        })
    }
}

/// Kind of user type a use site asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTypeKind {
    Any,
    Enum,
}

impl Display for UserTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UserTypeKind::Any => "any",
            UserTypeKind::Enum => "enum",
        })
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub definition: Span,
    pub bit_width: u32,
    /// distinct members in declaration order
    pub members: Vec<Name>,
    pub max_member_len: usize,
}

impl EnumType {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of members a width requires.
    pub fn required_members(bit_width: u32) -> usize {
        if bit_width == 1 {
            2
        } else {
            1 << bit_width
        }
    }
}

#[derive(Debug, Clone)]
pub enum UserType {
    Enum(EnumType),
}

impl UserType {
    pub fn kind(&self) -> UserTypeKind {
        match self {
            UserType::Enum(_) => UserTypeKind::Enum,
        }
    }

    pub fn bit_width(&self) -> u32 {
        match self {
            UserType::Enum(e) => e.bit_width,
        }
    }

    pub fn member_count(&self) -> usize {
        match self {
            UserType::Enum(e) => e.member_count(),
        }
    }
}

/// One row of a bit-group expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub identifier: String,
    pub command: CommandId,
}

#[derive(Debug, Clone)]
pub struct BitGroupParam {
    pub name: String,
    pub ty: String,
    pub member_count: usize,
}

#[derive(Debug, Clone)]
pub struct BitGroup {
    pub definition: Span,
    pub params: Vec<BitGroupParam>,
    /// one entry per full-factorial row, `None` if the definition failed
    pub table: Option<Vec<Substitution>>,
}

impl BitGroup {
    pub fn levels(&self) -> Vec<usize> {
        self.params.iter().map(|p| p.member_count).collect()
    }
}

#[derive(Debug, Clone)]
pub enum Identifier {
    Parameter { definition: Span, value: u32 },
    ControlBit(CommandId),
    UserType(UserType),
    BitGroup(BitGroup),
}

impl Identifier {
    pub fn kind(&self) -> IdentKind {
        match self {
            Identifier::Parameter { .. } => IdentKind::Parameter,
            Identifier::ControlBit(_) => IdentKind::ControlBit,
            Identifier::UserType(_) => IdentKind::UserType,
            Identifier::BitGroup(_) => IdentKind::BitGroup,
        }
    }
}

#[derive(Debug, Default)]
pub struct IdentTable {
    map: BTreeMap<String, Identifier>,
}

impl IdentTable {
    pub fn define(&mut self, name: &str, ident: Identifier) -> Result<(), SemanticError> {
        if let Some(existing) = self.map.get(name) {
            return Err(SemanticError::DuplicateDefinition {
                name: name.to_string(),
                existing: existing.kind(),
            });
        }
        self.map.insert(name.to_string(), ident);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Identifier, SemanticError> {
        self.map
            .get(name)
            .ok_or_else(|| SemanticError::UndefinedIdentifier {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&Identifier> {
        self.map.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Identifier> {
        self.map.get_mut(name)
    }

    pub fn require_kind(&self, name: &str, kind: IdentKind) -> Result<&Identifier, SemanticError> {
        let ident = self.lookup(name)?;
        if ident.kind() != kind {
            return Err(SemanticError::WrongType {
                name: name.to_string(),
                expected: kind,
                actual: ident.kind(),
            });
        }
        Ok(ident)
    }

    pub fn require_user_type(
        &self,
        name: &str,
        kind: UserTypeKind,
    ) -> Result<&UserType, SemanticError> {
        let Some(ident) = self.map.get(name) else {
            return Err(SemanticError::UndefinedType {
                name: name.to_string(),
                expected: kind,
            });
        };
        let Identifier::UserType(ty) = ident else {
            return Err(SemanticError::NotAType {
                name: name.to_string(),
                actual: ident.kind(),
            });
        };
        if kind != UserTypeKind::Any && ty.kind() != kind {
            return Err(SemanticError::WrongUserType {
                name: name.to_string(),
                expected: kind,
                actual: ty.kind(),
            });
        }
        Ok(ty)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
