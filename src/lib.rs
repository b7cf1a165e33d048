pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod cores;
pub mod diagnostic;
pub mod error;
pub mod hardware;
pub mod parse;
pub mod program;

pub use analysis::{analyse, Analysis};
pub use codegen::EmulatorSource;
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::SemanticError;
pub use hardware::CoreModel;
pub use program::{Program, ProgramListing};

#[derive(Debug, Default, Clone)]
pub struct CompileOption {
    verbose: bool,
    analyse_after_syntax_errors: bool,
}

impl CompileOption {
    /// Dump the syntax tree to the debug log.
    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
    /// Run semantic analysis on the valid statements even when the parser
    /// reported errors.
    pub fn set_analyse_after_syntax_errors(mut self, enable: bool) -> Self {
        self.analyse_after_syntax_errors = enable;
        self
    }
}

#[derive(Debug)]
pub struct Compiled {
    pub program: Program,
    pub diagnostics: Diagnostics,
}

impl Compiled {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse and analyse a microcode description against `core`.
pub fn compile(src: &str, core: &CoreModel, option: CompileOption) -> Compiled {
    let (ast, mut diagnostics) = parse::parse(src);
    if option.verbose {
        tracing::debug!(?ast, "syntax tree");
    }
    if diagnostics.has_syntax_errors() && !option.analyse_after_syntax_errors {
        tracing::info!(errors = diagnostics.len(), "syntax errors, analysis skipped");
        return Compiled {
            program: Program::default(),
            diagnostics,
        };
    }
    let analysis = analyse(&ast, core);
    diagnostics.extend(analysis.diagnostics);
    Compiled {
        program: analysis.program,
        diagnostics,
    }
}
