//! Hardware model of a virtual core: components, and the commands (control
//! bits) that move data between them.
//!
//! A model is assembled once with [`CoreBuilder`] and is read-only while a
//! microcode description is analysed against it.

use std::collections::BTreeSet;

use anyhow::{bail, ensure, Context, Result};

pub type ComponentId = usize;
pub type CommandId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ComponentKind {
    Register,
    Bus,
    Other,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Component {
    /// identifier used in generated code
    pub name: String,
    /// human readable name
    pub print_name: String,
    pub kind: ComponentKind,
}

/// Preprocessor style argument passed to the command's implementation file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Argument {
    pub name: String,
    pub value: String,
}

/// A primitive control operation.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Command {
    pub name: String,
    /// implementation file, without extension
    pub file: String,
    pub arguments: Vec<Argument>,
    /// components whose value is read
    pub depends: Vec<ComponentId>,
    /// components whose value is written
    pub changes: Vec<ComponentId>,
    /// buses that must already carry a value this cycle
    pub bus_read: Vec<ComponentId>,
    /// buses driven by this command
    pub bus_write: Vec<ComponentId>,
}

impl Command {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            ..Self::default()
        }
    }
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value: value.into(),
        });
        self
    }
    pub fn depends(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.depends.extend(ids);
        self
    }
    pub fn changes(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.changes.extend(ids);
        self
    }
    pub fn bus_read(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.bus_read.extend(ids);
        self
    }
    pub fn bus_write(mut self, ids: impl IntoIterator<Item = ComponentId>) -> Self {
        self.bus_write.extend(ids);
        self
    }
    /// Whether running `self` before `other` is required, i.e. `self`
    /// writes something `other` reads.
    pub fn feeds(&self, other: &Command) -> bool {
        self.changes.iter().any(|c| other.depends.contains(c))
    }
}

/// Read-only model consumed by analysis and code generation.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CoreModel {
    components: Vec<Component>,
    commands: Vec<Command>,
    /// system headers of the emitted emulator
    pub headers: BTreeSet<String>,
    /// state declared once per emulator run
    pub variables: Vec<String>,
    /// state declared at the start of each cycle
    pub loop_variables: Vec<String>,
    /// directory prefix of command implementation files
    pub include_base: String,
}

impl CoreModel {
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Look up a command by id. An id out of range is a broken invariant of
    /// the caller, not a user error.
    pub fn command(&self, id: CommandId) -> &Command {
        match self.commands.get(id) {
            Some(cmd) => cmd,
            None => panic!(
                "command id {} out of range, the core has {} commands",
                id,
                self.commands.len()
            ),
        }
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        match self.components.get(id) {
            Some(c) => c,
            None => panic!(
                "component id {} out of range, the core has {} components",
                id,
                self.components.len()
            ),
        }
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components.iter().position(|c| c.name == name)
    }

    pub fn find_command(&self, name: &str) -> Option<CommandId> {
        self.commands.iter().position(|c| c.name == name)
    }
}

/// Direction of a bus to register connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `<bus>To<reg>` only
    BusToRegister,
    /// `<reg>To<bus>` only
    RegisterToBus,
    Both,
}

/// Handle returned by [`CoreBuilder::add_memory64k`].
#[derive(Debug, Clone, Copy)]
pub struct Memory {
    pub memory: ComponentId,
    pub address: ComponentId,
}

#[derive(Debug, Default)]
pub struct CoreBuilder {
    core: CoreModel,
}

impl CoreBuilder {
    pub fn new(include_base: impl Into<String>) -> Self {
        Self {
            core: CoreModel {
                include_base: include_base.into(),
                ..CoreModel::default()
            },
        }
    }

    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        print_name: impl Into<String>,
        kind: ComponentKind,
    ) -> Result<ComponentId> {
        let name = name.into();
        ensure!(
            self.core.find_component(&name).is_none(),
            "component `{}` is already defined",
            name
        );
        self.core.components.push(Component {
            name,
            print_name: print_name.into(),
            kind,
        });
        Ok(self.core.components.len() - 1)
    }

    pub fn add_command(&mut self, command: Command) -> Result<CommandId> {
        ensure!(
            self.core.find_command(&command.name).is_none(),
            "command `{}` is already defined",
            command.name
        );
        let count = self.core.components.len();
        for id in command
            .depends
            .iter()
            .chain(&command.changes)
            .chain(&command.bus_read)
            .chain(&command.bus_write)
        {
            ensure!(
                *id < count,
                "command `{}` refers to unknown component {}",
                command.name,
                id
            );
        }
        for id in command.bus_read.iter().chain(&command.bus_write) {
            self.expect_kind(*id, ComponentKind::Bus)
                .with_context(|| format!("in command `{}`", command.name))?;
        }
        tracing::trace!(name = %command.name, "add command");
        self.core.commands.push(command);
        Ok(self.core.commands.len() - 1)
    }

    fn expect_kind(&self, id: ComponentId, kind: ComponentKind) -> Result<()> {
        let Some(component) = self.core.components.get(id) else {
            bail!("unknown component {}", id)
        };
        ensure!(
            component.kind == kind,
            "component `{}` is a {:?}, expecting a {:?}",
            component.name,
            component.kind,
            kind
        );
        Ok(())
    }

    fn uint16(&mut self, name: &str) {
        self.core.headers.insert("stdint.h".into());
        self.core.variables.push(format!("uint16_t {}", name));
    }

    pub fn add_register(&mut self, name: &str) -> Result<ComponentId> {
        let id = self.add_component(name, name, ComponentKind::Register)?;
        self.uint16(name);
        Ok(id)
    }

    pub fn add_bus(&mut self, name: &str) -> Result<ComponentId> {
        let id = self.add_component(name, name, ComponentKind::Bus)?;
        self.uint16(name);
        Ok(id)
    }

    /// Instruction register latched from `bus` by `iRegSet`; exposes the
    /// `opcode` the emulator dispatches on.
    pub fn add_instruction_register(&mut self, bus: ComponentId) -> Result<ComponentId> {
        self.expect_kind(bus, ComponentKind::Bus)
            .context("instruction register must be loaded from a bus")?;
        let ireg = self.add_component("IReg", "Instruction Register", ComponentKind::Other)?;
        let bus_name = self.core.component(bus).name.clone();
        self.add_command(
            Command::new("iRegSet", "iRegSet")
                .arg("BUS", bus_name)
                .depends([bus])
                .changes([ireg])
                .bus_read([bus]),
        )?;
        for var in ["opcode", "arg1", "arg2", "arg3", "arg12", "arg123"] {
            self.uint16(var);
        }
        Ok(ireg)
    }

    /// 64k words of memory addressed by `address` and exchanging data on
    /// `data`.
    pub fn add_memory64k(&mut self, address: ComponentId, data: ComponentId) -> Result<Memory> {
        self.expect_kind(address, ComponentKind::Bus)
            .context("memory address must be a bus")?;
        self.expect_kind(data, ComponentKind::Bus)
            .context("memory data must be a bus")?;
        let memory = self.add_component("Memory64", "Memory", ComponentKind::Other)?;
        let handle = Memory { memory, address };
        self.add_memory_bus_output(handle, data)?;
        let address_name = self.core.component(address).name.clone();
        let data_name = self.core.component(data).name.clone();
        self.add_command(
            Command::new("memWrite", "memWrite")
                .arg("ADDRESS", address_name)
                .arg("DATA", data_name)
                .depends([address, data])
                .changes([memory])
                .bus_read([address, data]),
        )?;
        Ok(handle)
    }

    /// Let `memory` drive `bus` with `memReadTo<bus>`.
    pub fn add_memory_bus_output(&mut self, memory: Memory, bus: ComponentId) -> Result<CommandId> {
        self.expect_kind(bus, ComponentKind::Bus)
            .context("memory output must be a bus")?;
        let address_name = self.core.component(memory.address).name.clone();
        let bus_name = self.core.component(bus).name.clone();
        self.add_command(
            Command::new(format!("memReadTo{}", bus_name), "memRead")
                .arg("ADDRESS", address_name)
                .arg("DATA", bus_name)
                .depends([memory.address, memory.memory])
                .changes([bus])
                .bus_read([memory.address])
                .bus_write([bus]),
        )
    }

    pub fn add_bus_register_connection(
        &mut self,
        bus: ComponentId,
        register: ComponentId,
        direction: Direction,
    ) -> Result<()> {
        self.expect_kind(bus, ComponentKind::Bus)
            .context("connection source must be a bus")?;
        self.expect_kind(register, ComponentKind::Register)
            .context("connection target must be a register")?;
        let bus_name = self.core.component(bus).name.clone();
        let reg_name = self.core.component(register).name.clone();

        if direction != Direction::RegisterToBus {
            self.add_command(
                Command::new(format!("{}To{}", bus_name, reg_name), "busToReg")
                    .arg("BUS", &bus_name)
                    .arg("REGISTER", &reg_name)
                    .depends([bus])
                    .changes([register])
                    .bus_read([bus]),
            )?;
        }
        if direction != Direction::BusToRegister {
            self.add_command(
                Command::new(format!("{}To{}", reg_name, bus_name), "regToBus")
                    .arg("BUS", &bus_name)
                    .arg("REGISTER", &reg_name)
                    .depends([register])
                    .changes([bus])
                    .bus_write([bus]),
            )?;
        }
        Ok(())
    }

    /// Per-cycle `currentCondition` selecting the high bits of conditional
    /// lines.
    pub fn add_condition_register(&mut self) {
        self.uint16("conditions");
        self.core
            .loop_variables
            .push("uint16_t currentCondition = 0".into());
    }

    pub fn add_halt_instruction(&mut self) -> Result<CommandId> {
        self.core.headers.insert("stdlib.h".into());
        self.add_command(Command::new("halt", "halt"))
    }

    pub fn finish(self) -> CoreModel {
        tracing::debug!(
            components = self.core.components.len(),
            commands = self.core.commands.len(),
            "core built"
        );
        self.core
    }
}
