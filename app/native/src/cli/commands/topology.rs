//! Topology CLI command.
//!
//! Prints the connected displays and their desktops with the numbers the
//! target flags accept.

use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::types::Context;
use crate::cli::output;
use crate::error::WallspaceError;
use crate::topology::DisplayTopology;

#[derive(Tabled)]
struct DesktopRow {
    #[tabled(rename = "Display")]
    display: String,
    #[tabled(rename = "Desktop")]
    desktop: u32,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Desktop UUID")]
    uuid: String,
    #[tabled(rename = "Display UUID")]
    display_uuid: String,
}

/// Execute the topology command.
pub fn execute(ctx: &Context) -> Result<(), WallspaceError> {
    let topology = ctx.open()?.get_topology()?;

    if ctx.json {
        return output::print_json(&topology);
    }

    let rows = rows(&topology);
    if rows.is_empty() {
        println!("{}", "No desktops detected.".dimmed());
        return Ok(());
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .with(Modify::new(Columns::new(2..3)).with(Alignment::center()))
        .to_string();

    println!("{}", format!("Displays ({})", topology.monitors.len()).bold());
    println!("{table}");
    Ok(())
}

fn rows(topology: &DisplayTopology) -> Vec<DesktopRow> {
    topology
        .monitors
        .iter()
        .flat_map(|monitor| {
            let display = if monitor.connected {
                monitor.human_display_number.to_string()
            } else {
                "disconnected".to_string()
            };
            monitor.spaces.iter().map(move |desktop| DesktopRow {
                display: display.clone(),
                desktop: desktop.global_desktop_number,
                current: output::format_bool(desktop.is_current),
                uuid: if desktop.uuid.is_empty() { "(default)".to_string() } else { desktop.uuid.clone() },
                display_uuid: monitor.uuid.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Desktop, Monitor};

    #[test]
    fn test_rows_flatten_monitors() {
        let topology = DisplayTopology {
            monitors: vec![
                Monitor {
                    uuid: "Main".to_string(),
                    live_id: 1,
                    human_display_number: 1,
                    connected: true,
                    spaces: vec![
                        Desktop { uuid: String::new(), id: 1, global_desktop_number: 1, is_current: true },
                        Desktop { uuid: "B".to_string(), id: 5, global_desktop_number: 2, is_current: false },
                    ],
                },
                Monitor {
                    uuid: "Other".to_string(),
                    live_id: 0,
                    human_display_number: -1,
                    connected: false,
                    spaces: vec![Desktop {
                        uuid: "C".to_string(),
                        id: 9,
                        global_desktop_number: 3,
                        is_current: false,
                    }],
                },
            ],
        };

        let rows = rows(&topology);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].uuid, "(default)");
        assert_eq!(rows[1].desktop, 2);
        assert_eq!(rows[2].display, "disconnected");
    }
}
