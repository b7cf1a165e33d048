//! Scheduling of a single microcode line.

use super::graph::DependencyGraph;
use crate::hardware::{CommandId, ComponentId, CoreModel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// the commands' dependencies form a cycle
    Unorderable,
    /// a command reads this bus before any command of the line wrote it
    ReadBeforeWrite(ComponentId),
}

/// Order the commands of a line so that every writer runs before its
/// readers, then replay the order to check bus usage.
pub fn schedule(core: &CoreModel, commands: &[CommandId]) -> Result<Vec<CommandId>, LineError> {
    let graph = DependencyGraph::build(core, commands);
    let order = graph.order().map_err(|cycle| {
        tracing::debug!(remaining = ?cycle.remaining, "dependency cycle");
        LineError::Unorderable
    })?;
    check_bus_hazards(core, &order)?;
    Ok(order)
}

/// Walk `order` and fail at the first bus read before a write. Several
/// writers of one bus are accepted.
pub fn check_bus_hazards(core: &CoreModel, order: &[CommandId]) -> Result<(), LineError> {
    let mut written = vec![false; core.components().len()];
    for &id in order {
        let cmd = core.command(id);
        if let Some(&bus) = cmd.bus_read.iter().find(|&&bus| !written[bus]) {
            return Err(LineError::ReadBeforeWrite(bus));
        }
        for &bus in &cmd.bus_write {
            written[bus] = true;
        }
    }
    Ok(())
}
