// End to end analysis of microcode descriptions

use anyhow::{ensure, Context, Result};
use microcode_rs::{
    analysis::ident::{IdentKind, UserTypeKind},
    compile,
    cores::create_core,
    hardware::{Command, ComponentKind, CoreBuilder, CoreModel},
    CompileOption, Compiled, SemanticError,
};

fn basic16(src: &str) -> Result<(CoreModel, Compiled)> {
    let core = create_core("basic16")?;
    let compiled = compile(src, &core, CompileOption::default());
    Ok((core, compiled))
}

fn errors(compiled: &Compiled) -> Vec<SemanticError> {
    compiled.diagnostics.semantic_errors().cloned().collect()
}

fn names(core: &CoreModel, ids: &[usize]) -> Vec<String> {
    ids.iter().map(|&id| core.command(id).name.clone()).collect()
}

/// `A` drives bus `R`; `B` reads `R` and drives `S`.
fn writer_reader_core() -> Result<CoreModel> {
    let mut b = CoreBuilder::new("");
    let r = b.add_component("R", "R", ComponentKind::Bus)?;
    let s = b.add_component("S", "S", ComponentKind::Bus)?;
    b.add_command(Command::new("A", "a").changes([r]).bus_write([r]))?;
    b.add_command(
        Command::new("B", "b")
            .depends([r])
            .changes([s])
            .bus_read([r])
            .bus_write([s]),
    )?;
    Ok(b.finish())
}

const PRELUDE: &str = r#"
phase = 3;
opsize = 4;
type Reg = enum(2) { A, B, C, D };
bitgroup regIn(r: Reg) = DataTo[r];
bitgroup regOut(r: Reg) = [r]ToData;
header {
    IPToAddr, memReadToData, iRegSet;
    ipInc;
}
"#;

#[test]
fn test_writer_scheduled_first() -> Result<()> {
    let core = writer_reader_core()?;
    let compiled = compile("phase = 1;\nheader { B, A; }", &core, CompileOption::default());
    ensure!(compiled.is_ok(), "{:?}", compiled.diagnostics);
    assert_eq!(names(&core, &compiled.program.head), vec!["A", "B"]);
    Ok(())
}

#[test]
fn test_read_before_write() -> Result<()> {
    let core = writer_reader_core()?;
    let compiled = compile("phase = 1;\nheader { B; }", &core, CompileOption::default());
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::ReadBeforeWrite {
            line: 1,
            bus: "R".into()
        }]
    );
    assert!(compiled.program.head.is_empty());
    Ok(())
}

#[test]
fn test_opcode_variants() -> Result<()> {
    let src = format!(
        "{PRELUDE}\nopcode 0b01 load(dst: Reg) {{\n    IPToAddr, memReadToData, regIn(dst);\n    ipInc;\n}}\n"
    );
    let (core, compiled) = basic16(&src)?;
    ensure!(compiled.is_ok(), "{:?}", compiled.diagnostics);

    let program = &compiled.program;
    assert_eq!(program.opcodes().len(), 16);
    let ids: Vec<_> = program.defined_opcodes().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![0b0100, 0b0101, 0b0110, 0b0111]);
    for (reg, id) in ["A", "B", "C", "D"].iter().zip(ids) {
        let op = program.opcode(id).context("defined")?;
        assert_eq!(op.name, "load");
        assert_eq!(
            names(&core, &op.lines[0].low),
            vec![
                "IPToAddr".to_string(),
                "memReadToData".to_string(),
                format!("DataTo{reg}")
            ]
        );
        assert_eq!(op.lines[0].high(), op.lines[0].low.as_slice());
    }
    Ok(())
}

#[test]
fn test_conditional_line() -> Result<()> {
    let src = format!(
        "{PRELUDE}\nopcode 0b0010 jumpIf {{\n    ? DataToIP, TToData : ipInc;\n}}\n"
    );
    let (core, compiled) = basic16(&src)?;
    ensure!(compiled.is_ok(), "{:?}", compiled.diagnostics);
    let op = compiled.program.opcode(2).context("jumpIf")?;
    let line = &op.lines[0];
    assert_eq!(names(&core, line.high()), vec!["TToData", "DataToIP"]);
    assert_eq!(names(&core, &line.low), vec!["ipInc"]);
    Ok(())
}

#[test]
fn test_multi_parameter_encoding() -> Result<()> {
    let src = r#"
phase = 2;
opsize = 6;
type Reg = enum(2) { A, B, C, D };
bitgroup regIn(r: Reg) = DataTo[r];
bitgroup regOut(r: Reg) = [r]ToData;
header { ipInc; }
opcode 0b11 mov(src: Reg, dst: Reg) {
    regOut(src), regIn(dst);
}
"#;
    let (core, compiled) = basic16(src)?;
    // src == dst reads and writes the same register through the bus
    assert_eq!(errors(&compiled), vec![SemanticError::UnorderableLine { line: 1 }]);

    // src occupies the higher bits: 0b11_01_10 moves B into C
    let op = compiled.program.opcode(0b110110).context("mov B C")?;
    assert_eq!(names(&core, &op.lines[0].low), vec!["BToData", "DataToC"]);
    let same = compiled.program.opcode(0b110101).context("mov B B")?;
    assert!(same.lines[0].low.is_empty());
    Ok(())
}

#[test]
fn test_parameters_reported_once() -> Result<()> {
    let src = r#"
header { ipInc; }
opcode 0b0001 a { ipInc; }
opcode 0b0010 b { ipInc; }
"#;
    let (_, compiled) = basic16(src)?;
    assert_eq!(
        errors(&compiled),
        vec![
            SemanticError::ParameterMissing {
                name: "phase".into(),
                usage: "header"
            },
            SemanticError::ParameterMissing {
                name: "opsize".into(),
                usage: "opcode"
            },
        ]
    );
    Ok(())
}

#[test]
fn test_parameter_wrong_kind() -> Result<()> {
    let (_, compiled) = basic16("type phase = enum(1) { x, y };\nheader { ipInc; }")?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::ParameterWrongKind {
            name: "phase".into(),
            usage: "header",
            actual: IdentKind::UserType,
        }]
    );
    Ok(())
}

#[test]
fn test_duplicate_definitions() -> Result<()> {
    let src = "phase = 4;\ntype halt = enum(1) { a, b };\nbitgroup Reg = ipInc;";
    let (_, compiled) = basic16(&format!("{PRELUDE}\n{src}"))?;
    assert_eq!(
        errors(&compiled),
        vec![
            SemanticError::DuplicateDefinition {
                name: "phase".into(),
                existing: IdentKind::Parameter
            },
            SemanticError::DuplicateDefinition {
                name: "halt".into(),
                existing: IdentKind::ControlBit
            },
            SemanticError::DuplicateDefinition {
                name: "Reg".into(),
                existing: IdentKind::UserType
            },
        ]
    );
    Ok(())
}

#[test]
fn test_bitgroup_redefined() -> Result<()> {
    let (_, compiled) = basic16("bitgroup g = ipInc;\ng = 1;\ntype g = enum(1) { a, b };")?;
    let clash = SemanticError::DuplicateDefinition {
        name: "g".into(),
        existing: IdentKind::BitGroup,
    };
    assert_eq!(errors(&compiled), vec![clash.clone(), clash]);
    Ok(())
}

#[test]
fn test_wide_enum_in_opcode() -> Result<()> {
    let src = format!(
        "{PRELUDE}\ntype W = enum(4294967295) {{ A, B }};\nopcode 0b1 wide(w: W, v: W) {{ halt; }}\n"
    );
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![
            SemanticError::EnumTooWide {
                width: u32::MAX,
                max: 16
            },
            SemanticError::HeaderTooLarge {
                found: 1 + 2 * u64::from(u32::MAX),
                expected: 4
            },
        ]
    );
    assert_eq!(compiled.program.defined_opcodes().count(), 0);
    Ok(())
}

#[test]
fn test_duplicate_header() -> Result<()> {
    let (_, compiled) = basic16("phase = 2;\nheader { ipInc; }\nheader { halt; }")?;
    let diags: Vec<_> = compiled.diagnostics.iter().collect();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].semantic_error(), Some(&SemanticError::DuplicateHeader));
    assert_eq!(diags[0].span.line, 3);
    let note = diags[0].note.as_ref().context("note")?;
    assert_eq!(note.span.line, 2);
    assert_eq!(compiled.program.head.len(), 1);
    Ok(())
}

#[test]
fn test_header_too_long() -> Result<()> {
    let (core, compiled) = basic16("phase = 1;\nheader { ipInc; halt; ipInc; }")?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::HeaderTooLong { lines: 3, max: 2 }]
    );
    assert_eq!(names(&core, &compiled.program.head), vec!["ipInc", "halt", "ipInc"]);
    Ok(())
}

#[test]
fn test_opcode_width() -> Result<()> {
    let src = format!("{PRELUDE}\nopcode 0b0 small {{ halt; }}\nopcode 0b111 large(r: Reg) {{ halt; }}\n");
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![
            SemanticError::HeaderTooSmall {
                found: 1,
                expected: 4
            },
            SemanticError::HeaderTooLarge {
                found: 5,
                expected: 4
            },
        ]
    );
    assert_eq!(compiled.program.defined_opcodes().count(), 0);
    Ok(())
}

#[test]
fn test_too_many_lines() -> Result<()> {
    let body = "ipInc;\n".repeat(7);
    let src = format!("{PRELUDE}\nopcode 0b0011 long {{\n{body}}}\n");
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::TooManyLines { lines: 7, max: 6 }]
    );
    Ok(())
}

#[test]
fn test_opcode_before_header_is_skipped() -> Result<()> {
    let (_, compiled) = basic16("phase = 2;\nopsize = 2;\nopcode 0b00 early { nothing; }")?;
    assert!(compiled.is_ok());
    assert!(compiled.program.opcodes().is_empty());
    Ok(())
}

#[test]
fn test_parameter_shadow() -> Result<()> {
    let src = format!("{PRELUDE}\nopcode 0b0 dup(r: Reg, r: Reg) {{ halt; }}\n");
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::ParameterShadow { name: "r".into() }]
    );

    // the name clash is found even when the type is unknown
    let src = format!("{PRELUDE}\nopcode 0b0 dup(r: Missing, r: Missing) {{ halt; }}\n");
    let (_, compiled) = basic16(&src)?;
    let undefined = SemanticError::UndefinedType {
        name: "Missing".into(),
        expected: UserTypeKind::Any,
    };
    assert_eq!(
        errors(&compiled),
        vec![
            undefined.clone(),
            undefined,
            SemanticError::ParameterShadow { name: "r".into() },
        ]
    );
    Ok(())
}

#[test]
fn test_opcode_redefined() -> Result<()> {
    let src = format!(
        "{PRELUDE}\nopcode 0b01 load(r: Reg) {{ TToData, regIn(r); }}\nopcode 0b0110 clash {{ halt; }}\n"
    );
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::OpcodeRedefined { id: 0b0110 }]
    );
    let diag = compiled.diagnostics.iter().next().context("one error")?;
    assert_eq!(
        diag.semantic_error(),
        Some(&SemanticError::OpcodeRedefined { id: 0b0110 })
    );
    assert!(diag.note.is_some());
    assert_eq!(compiled.program.opcode(0b0110).map(|op| op.name.as_str()), Some("load"));
    Ok(())
}

#[test]
fn test_bit_type_errors() -> Result<()> {
    let src = format!("{PRELUDE}\nopcode 0b0011 bad {{ phase, unknown, Reg; }}\n");
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![
            SemanticError::WrongType {
                name: "phase".into(),
                expected: IdentKind::ControlBit,
                actual: IdentKind::Parameter
            },
            SemanticError::UndefinedIdentifier {
                name: "unknown".into()
            },
            SemanticError::WrongType {
                name: "Reg".into(),
                expected: IdentKind::ControlBit,
                actual: IdentKind::UserType
            },
        ]
    );
    Ok(())
}

#[test]
fn test_bitgroup_arguments() -> Result<()> {
    let src = format!(
        r#"{PRELUDE}
type Flag = enum(1) {{ Off, On }};
opcode 0b01 a(r: Reg) {{ regIn(x); }}
opcode 0b10 b(r: Reg) {{ regIn(r, r); }}
opcode 0b001 c(f: Flag) {{ regIn(f); }}
header {{ regIn(r); }}
"#
    );
    let (_, compiled) = basic16(&src)?;
    let errs = errors(&compiled);
    assert_eq!(
        errs,
        vec![
            SemanticError::BitGroupArgumentUnresolved { name: "x".into() },
            SemanticError::BitGroupArgumentCount {
                name: "regIn".into(),
                expected: 1,
                found: 2
            },
            SemanticError::BitGroupArgumentType {
                name: "f".into(),
                expected: "Reg".into(),
                found: "Flag".into()
            },
            SemanticError::DuplicateHeader,
        ]
    );
    Ok(())
}

#[test]
fn test_failed_bitgroup_is_silent() -> Result<()> {
    let src = format!(
        "{PRELUDE}\ntype Bad = enum(1) {{ A, Q }};\nbitgroup broken(r: Bad) = DataTo[r];\nopcode 0b001 use(r: Bad) {{ broken(r); }}\n"
    );
    let (_, compiled) = basic16(&src)?;
    assert_eq!(
        errors(&compiled),
        vec![SemanticError::SubstitutionUnresolved {
            identifier: "DataToQ".into()
        }]
    );
    assert_eq!(compiled.program.defined_opcodes().count(), 0);
    Ok(())
}

#[test]
fn test_bitgroup_definition_errors() -> Result<()> {
    let src = r#"
type Reg = enum(2) { A, B, C, D };
bitgroup a(r: Missing) = x;
bitgroup b(r: halt) = x;
bitgroup c(r: Reg, r: Reg) = [r]ToData;
bitgroup d(r: Reg) = [q]ToData;
type Kinds = enum(1) { Reg, a };
bitgroup e(k: Kinds) = [k];
"#;
    let (_, compiled) = basic16(src)?;
    let errs = errors(&compiled);
    assert_eq!(errs.len(), 5, "{:?}", errs);
    assert!(matches!(errs[0], SemanticError::UndefinedType { .. }));
    assert!(matches!(
        errs[1],
        SemanticError::NotAType {
            actual: IdentKind::ControlBit,
            ..
        }
    ));
    assert!(matches!(errs[2], SemanticError::ParameterShadow { .. }));
    assert!(matches!(errs[3], SemanticError::SubstitutionVariableUndefined { .. }));
    assert_eq!(
        errs[4],
        SemanticError::SubstitutionWrongType {
            identifier: "Reg".into(),
            actual: IdentKind::UserType
        }
    );
    Ok(())
}

#[test]
fn test_enum_member_counts() -> Result<()> {
    let src = r#"
type One = enum(1) { a };
type Two = enum(1) { a, b };
type Three = enum(2) { a, b, c, d, e };
type Four = enum(2) { a, b, a, c };
"#;
    let (_, compiled) = basic16(src)?;
    let diags: Vec<_> = compiled.diagnostics.iter().collect();
    assert_eq!(
        diags[0].semantic_error(),
        Some(&SemanticError::EnumMoreMembers {
            expected: 2,
            found: 1
        })
    );
    assert_eq!(
        diags[1].semantic_error(),
        Some(&SemanticError::EnumLessMembers {
            expected: 4,
            found: 5
        })
    );
    // the first extra member
    assert_eq!(diags[1].span.line, 4);
    assert_eq!(diags[1].span.column, 36);
    assert_eq!(
        diags[2].semantic_error(),
        Some(&SemanticError::EnumDuplicateMember { name: "a".into() })
    );
    assert!(diags[2].note.is_some());
    assert_eq!(diags.len(), 3);
    Ok(())
}
