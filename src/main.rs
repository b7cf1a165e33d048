use std::io::IsTerminal;

use anyhow::{bail, Context, Result};
use binutils::{clap, verbose};
use clap::{Parser, ValueEnum};
use microcode_rs::{compile, cores, CompileOption, EmulatorSource, ProgramListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// C source of the emulator
    C,
    /// human readable dispatch table
    Table,
}

// Microcode compiler: schedules control bits and emits an emulator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the microcode description
    input: String,

    /// Output filename (default is input%.c, or input%.txt for tables)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Virtual core the description targets
    #[arg(long, default_value = "basic16", value_parser = clap::builder::PossibleValuesParser::new(cores::core_names()))]
    core: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = Emit::C)]
    emit: Emit,

    /// Only report errors, write nothing
    #[arg(long)]
    check: bool,

    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();
    binutils::logging_setup(
        binutils::verbose_level_to_trace(args.verbose.log_level()),
        None::<std::fs::File>,
    );

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file `{}`", &args.input))?;
    let core = cores::create_core(&args.core)?;

    let verbose_ast = args
        .verbose
        .log_level()
        .is_some_and(|lv| lv >= verbose::Level::Trace);
    let compiled = compile(
        &content,
        &core,
        CompileOption::default().set_verbose(verbose_ast),
    );

    if !compiled.is_ok() {
        let color = std::io::stderr().is_terminal();
        eprint!("{}", compiled.diagnostics.render(&content, &args.input, color));
        bail!(
            "could not compile `{}` due to {} previous error(s)",
            &args.input,
            compiled.diagnostics.len()
        );
    }
    if args.check {
        return Ok(());
    }

    let output = match args.emit {
        Emit::C => EmulatorSource::new(&core, &compiled.program).to_string(),
        Emit::Table => ProgramListing {
            core: &core,
            program: &compiled.program,
        }
        .to_string(),
    };
    let output_path = if let Some(path) = args.output {
        path
    } else {
        let mut path = std::path::PathBuf::from(&args.input);
        path.set_extension(match args.emit {
            Emit::C => "c",
            Emit::Table => "txt",
        });
        path.to_string_lossy().into_owned()
    };
    std::fs::write(&output_path, output)
        .with_context(|| format!("could not write file `{}`", &output_path))?;
    tracing::info!(path = %output_path, "written");
    Ok(())
}
