//! C emulator emission.
//!
//! Every command becomes an `#include` of its implementation file wrapped in
//! `#define`/`#undef` of its arguments, so the emitted source has no runtime
//! dispatch besides the opcode switch.

use std::{collections::BTreeSet, fmt::Display};

use crate::{
    hardware::{CommandId, CoreModel},
    program::Program,
};

type Result = std::fmt::Result;

pub struct EmulatorSource<'a> {
    pub core: &'a CoreModel,
    pub program: &'a Program,
}

impl<'a> EmulatorSource<'a> {
    pub fn new(core: &'a CoreModel, program: &'a Program) -> Self {
        Self { core, program }
    }

    fn command(&self, f: &mut std::fmt::Formatter<'_>, id: CommandId, depth: usize) -> Result {
        let cmd = self.core.command(id);
        let pad = "    ".repeat(depth);
        writeln!(f, "{pad}// {}", cmd.name)?;
        for arg in &cmd.arguments {
            writeln!(f, "#define {} {}", arg.name, arg.value)?;
        }
        writeln!(f, "#include \"{}{}.c\"", self.core.include_base, cmd.file)?;
        for arg in &cmd.arguments {
            writeln!(f, "#undef {}", arg.name)?;
        }
        Ok(())
    }

    fn commands(&self, f: &mut std::fmt::Formatter<'_>, ids: &[CommandId], depth: usize) -> Result {
        ids.iter().try_for_each(|&id| self.command(f, id, depth))
    }

    fn function(&self, f: &mut std::fmt::Formatter<'_>, name: &str) -> Result {
        writeln!(f, "void {name}(uint16_t* memory) {{")?;
        for var in &self.core.variables {
            writeln!(f, "    {var} = {{0}};")?;
        }
        writeln!(f, "    while(1) {{")?;
        for var in &self.core.loop_variables {
            writeln!(f, "        {var};")?;
        }
        self.commands(f, &self.program.head, 2)?;
        writeln!(f, "        switch(opcode) {{")?;
        for (id, op) in self.program.defined_opcodes() {
            writeln!(f, "            case {id}: {{ // {}", op.name)?;
            for line in &op.lines {
                match &line.high {
                    Some(high) => {
                        writeln!(f, "                if(currentCondition) {{")?;
                        self.commands(f, high, 5)?;
                        writeln!(f, "                }} else {{")?;
                        self.commands(f, &line.low, 5)?;
                        writeln!(f, "                }}")?;
                    }
                    None => {
                        writeln!(f, "                {{")?;
                        self.commands(f, &line.low, 5)?;
                        writeln!(f, "                }}")?;
                    }
                }
            }
            writeln!(f, "                break;")?;
            writeln!(f, "            }}")?;
        }
        writeln!(f, "            default:")?;
        writeln!(f, "                exit(0);")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f, "}}")
    }
}

impl Display for EmulatorSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result {
        let mut headers: BTreeSet<&str> = self.core.headers.iter().map(String::as_str).collect();
        headers.extend(["stdint.h", "stdlib.h"]);
        for header in headers {
            writeln!(f, "#include <{header}>")?;
        }
        writeln!(f)?;
        self.function(f, "emulator")?;
        writeln!(f)?;
        writeln!(f, "#define DEBUG_OUTPUT")?;
        self.function(f, "emulatorVerbose")?;
        writeln!(f, "#undef DEBUG_OUTPUT")
    }
}
