//! Parameter, enum type and bit-group definitions.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    expand::full_factorial,
    ident::{BitGroup, BitGroupParam, EnumType, Identifier, Substitution, UserType, UserTypeKind},
    Analyser, MAX_WIDTH,
};
use crate::{
    ast::{BitGroupDef, Name, ParameterDef, Segment, TypeBody, TypeDef},
    diagnostic::Diagnostic,
    error::SemanticError,
};

impl Analyser<'_> {
    /// Add `name` to the identifier table, reporting a clash at its token.
    pub(super) fn define(&mut self, name: &Name, ident: Identifier) -> bool {
        match self.idents.define(name.as_str(), ident) {
            Ok(()) => true,
            Err(err) => {
                self.error(name.span, err);
                false
            }
        }
    }

    pub(super) fn analyse_parameter(&mut self, def: &ParameterDef) {
        tracing::info!(name = %def.name.value, value = def.value.value, "analysing parameter");
        self.define(
            &def.name,
            Identifier::Parameter {
                definition: def.name.span,
                value: def.value.value,
            },
        );
    }

    pub(super) fn analyse_type(&mut self, def: &TypeDef) {
        match &def.body {
            TypeBody::Enum(body) => {
                tracing::info!(name = %def.name.value, "analysing enum");
                let width = body.width.value;
                let mut problems = Vec::new();

                if width > MAX_WIDTH {
                    problems.push(Diagnostic::semantic(
                        body.width.span,
                        SemanticError::EnumTooWide {
                            width,
                            max: MAX_WIDTH,
                        },
                    ));
                } else {
                    let required = EnumType::required_members(width);
                    let found = body.members.len();
                    if found < required {
                        problems.push(Diagnostic::semantic(
                            def.name.span,
                            SemanticError::EnumMoreMembers {
                                expected: required,
                                found,
                            },
                        ));
                    } else if found > required {
                        problems.push(Diagnostic::semantic(
                            body.members[required].span,
                            SemanticError::EnumLessMembers {
                                expected: required,
                                found,
                            },
                        ));
                    }
                }

                let mut seen: BTreeMap<&str, &Name> = BTreeMap::new();
                let mut members = Vec::new();
                for member in &body.members {
                    if let Some(original) = seen.get(member.as_str()) {
                        problems.push(
                            Diagnostic::semantic(
                                member.span,
                                SemanticError::EnumDuplicateMember {
                                    name: member.value.clone(),
                                },
                            )
                            .with_note("originally defined here", original.span),
                        );
                    } else {
                        seen.insert(member.as_str(), member);
                        members.push(member.clone());
                    }
                }
                let max_member_len = members.iter().map(|m| m.value.len()).max().unwrap_or(0);

                let ty = EnumType {
                    definition: def.name.span,
                    bit_width: width,
                    members,
                    max_member_len,
                };
                if self.define(&def.name, Identifier::UserType(UserType::Enum(ty))) {
                    for problem in problems {
                        self.diagnostics.push(problem);
                    }
                }
            }
        }
    }

    pub(super) fn analyse_bitgroup(&mut self, def: &BitGroupDef) {
        tracing::info!(name = %def.name.value, "analysing bitgroup");
        let placeholder = Identifier::BitGroup(BitGroup {
            definition: def.name.span,
            params: Vec::new(),
            table: None,
        });
        if !self.define(&def.name, placeholder) {
            return;
        }

        let mut passed = true;
        let mut params = Vec::new();
        // member names per parameter, and the longest of each
        let mut members: Vec<(Vec<String>, usize)> = Vec::new();
        let mut names = BTreeSet::new();
        for param in &def.params {
            match self
                .idents
                .require_user_type(param.ty.as_str(), UserTypeKind::Enum)
            {
                Ok(UserType::Enum(ty)) => {
                    params.push(BitGroupParam {
                        name: param.name.value.clone(),
                        ty: param.ty.value.clone(),
                        member_count: ty.member_count(),
                    });
                    members.push((
                        ty.members.iter().map(|m| m.value.clone()).collect(),
                        ty.max_member_len,
                    ));
                }
                Err(err) => {
                    self.error(param.ty.span, err);
                    passed = false;
                }
            }
            if !names.insert(param.name.as_str()) {
                self.error(
                    param.name.span,
                    SemanticError::ParameterShadow {
                        name: param.name.value.clone(),
                    },
                );
                passed = false;
            }
        }

        for segment in &def.segments {
            if let Segment::Substitution(var) = segment {
                if !names.contains(var.as_str()) {
                    self.error(
                        var.span,
                        SemanticError::SubstitutionVariableUndefined {
                            name: var.value.clone(),
                        },
                    );
                    passed = false;
                }
            }
        }
        if !passed {
            return;
        }

        let capacity: usize = def
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(lit) => lit.value.len(),
                Segment::Substitution(var) => params
                    .iter()
                    .position(|p| p.name == var.value)
                    .map_or(0, |i| members[i].1),
            })
            .sum();
        let levels: Vec<usize> = params.iter().map(|p| p.member_count).collect();

        let mut table = Vec::new();
        for row in full_factorial(&levels) {
            let mut identifier = String::with_capacity(capacity);
            for segment in &def.segments {
                match segment {
                    Segment::Literal(lit) => identifier.push_str(&lit.value),
                    Segment::Substitution(var) => {
                        if let Some(i) = params.iter().position(|p| p.name == var.value) {
                            identifier.push_str(&members[i].0[row[i]]);
                        }
                    }
                }
            }
            let command = match self.idents.get(&identifier) {
                Some(Identifier::ControlBit(id)) => *id,
                Some(other) => {
                    let actual = other.kind();
                    self.error(
                        def.name.span,
                        SemanticError::SubstitutionWrongType { identifier, actual },
                    );
                    return;
                }
                None => {
                    self.error(
                        def.name.span,
                        SemanticError::SubstitutionUnresolved { identifier },
                    );
                    return;
                }
            };
            tracing::trace!(%identifier, command, "substituted");
            table.push(Substitution {
                identifier,
                command,
            });
        }

        if let Some(Identifier::BitGroup(group)) = self.idents.get_mut(def.name.as_str()) {
            group.params = params;
            group.table = Some(table);
        }
    }
}
