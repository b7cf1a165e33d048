// Builtin virtual cores
mod basic16;

use anyhow::{bail, Result};

use crate::hardware::CoreModel;

/// Get all core names
pub fn core_names() -> Vec<&'static str> {
    vec![basic16::NAME]
}

pub fn create_core(name: &str) -> Result<CoreModel> {
    match name {
        basic16::NAME => basic16::build(),
        _ => bail!(
            "unknown core `{}`, available cores: {}",
            name,
            core_names().join(", ")
        ),
    }
}
