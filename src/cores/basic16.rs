//! 16 bit accumulator style core with separate address and data buses.
//!
//! Registers `A`..`D` and the temporary `T` talk to the data bus; `IP` and
//! `T` can drive the address bus.

use anyhow::Result;

use crate::hardware::{Command, CoreBuilder, CoreModel, Direction};

pub const NAME: &str = "basic16";

pub fn build() -> Result<CoreModel> {
    let mut b = CoreBuilder::new("emulator/runtime/");
    let addr = b.add_bus("Addr")?;
    let data = b.add_bus("Data")?;

    for name in ["A", "B", "C", "D"] {
        let reg = b.add_register(name)?;
        b.add_bus_register_connection(data, reg, Direction::Both)?;
    }
    let t = b.add_register("T")?;
    b.add_bus_register_connection(data, t, Direction::Both)?;
    b.add_bus_register_connection(addr, t, Direction::RegisterToBus)?;

    let ip = b.add_register("IP")?;
    b.add_bus_register_connection(data, ip, Direction::Both)?;
    b.add_bus_register_connection(addr, ip, Direction::RegisterToBus)?;
    b.add_command(
        Command::new("ipInc", "increment")
            .arg("REGISTER", "IP")
            .depends([ip])
            .changes([ip]),
    )?;

    b.add_memory64k(addr, data)?;
    b.add_instruction_register(data)?;
    b.add_condition_register();
    b.add_halt_instruction()?;
    Ok(b.finish())
}
