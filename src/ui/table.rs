use crate::Result;
use crate::conflict::Conflict;
use comfy_table::{Cell, ContentArrangement, Table};

pub fn print_table(table: Table) -> Result<()> {
    let table = table.to_string();
    for line in table.lines() {
        println!("{}", line.trim_end());
    }
    Ok(())
}

/// Render the full conflict picture before per-conflict resolution begins,
/// so a user resolving several conflicts sees everything up front.
pub fn print_conflict_summary(conflicts: &[Conflict]) -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if console::user_attended() {
        table.set_header(vec!["Port", "Service", "PID", "Command"]);
    }

    for conflict in conflicts {
        for (i, listener) in conflict.listeners.iter().enumerate() {
            let (port, service) = if i == 0 {
                (conflict.port.to_string(), conflict.service.clone())
            } else {
                // repeat rows for extra listeners without repeating the binding
                (String::new(), String::new())
            };
            table.add_row(vec![
                Cell::new(port),
                Cell::new(service),
                Cell::new(listener.pid),
                Cell::new(&listener.command),
            ]);
        }
    }

    println!(
        "{}",
        console::style(format!(
            "{} port conflict(s) detected:",
            conflicts.len()
        ))
        .yellow()
        .bold()
    );
    print_table(table)
}
