// Show the resolved catalog and which images are already present locally

use anyhow::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Table};

use super::pull::runtime_for;
use crate::config::Settings;
use crate::provision::{ContainerRuntime, ImageRef};

/// Print the catalog as a table. Never pulls.
pub fn list_images(settings: &Settings) -> Result<()> {
    let resolved = settings.catalog.resolve_from_env()?;
    let runtime = runtime_for(settings)?;
    runtime.check_available()?;

    if resolved.is_empty() {
        println!("No images configured.");
        return Ok(());
    }

    println!("{}", image_table(&runtime, &resolved)?);
    Ok(())
}

fn image_table<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    resolved: &[(String, ImageRef)],
) -> Result<Table> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("NAME").add_attribute(Attribute::Bold),
            Cell::new("IMAGE").add_attribute(Attribute::Bold),
            Cell::new("STATUS").add_attribute(Attribute::Bold),
        ]);

    for (name, image) in resolved {
        let status = if runtime.image_present(image)? {
            "present"
        } else {
            "missing"
        };
        table.add_row(vec![Cell::new(name), Cell::new(image), Cell::new(status)]);
    }

    Ok(table)
}
