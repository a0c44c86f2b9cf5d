use crate::Result;
use crate::config::PortsideToml;
use crate::ui::table::print_table;
use comfy_table::{Cell, ContentArrangement, Table};
use itertools::Itertools;

/// List all products
#[derive(Debug, clap::Args)]
#[clap(
    visible_alias = "ls",
    verbatim_doc_comment,
    long_about = "\
List all products

Displays a table of the products defined in portside.toml with their
supported run modes and declared ports.

Example:
  portside list
  portside ls                     Alias for 'list'
  portside list --hide-header     Output without column headers"
)]
pub struct List {
    /// Hide the table header row
    #[clap(long)]
    hide_header: bool,
}

impl List {
    pub async fn run(&self) -> Result<()> {
        let config = PortsideToml::load()?;

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.hide_header && console::user_attended() {
            table.set_header(vec!["Name", "Modes", "Ports"]);
        }

        for (name, product) in config.products.iter() {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(product.supported_modes()),
                Cell::new(
                    product
                        .ports
                        .iter()
                        .map(|decl| format!("{} ({})", decl.port, decl.service))
                        .join(", "),
                ),
            ]);
        }

        print_table(table)
    }
}
