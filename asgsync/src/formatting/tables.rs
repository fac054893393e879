//! Table formatting utilities using comfy-table.

use comfy_table::{Cell, Table};

fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(*h).add_attribute(comfy_table::Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

/// Prints numbered choices, starting at 1.
pub fn print_choice_table(title: &str, choices: &[String]) {
    let mut table = styled_table(&["#", title]);
    for (index, choice) in choices.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).fg(comfy_table::Color::Cyan),
            Cell::new(choice).fg(comfy_table::Color::White),
        ]);
    }
    println!("{}", table);
}

/// Prints load balancer nodes with the action taken on each.
pub fn print_node_table(rows: &[(u64, String, &str)]) {
    let mut table = styled_table(&["Load balancer", "Address", "Action"]);
    for (lb_id, address, action) in rows {
        let color = match *action {
            "deleted" => comfy_table::Color::Red,
            "drained" => comfy_table::Color::Yellow,
            _ => comfy_table::Color::DarkGrey,
        };
        table.add_row(vec![
            Cell::new(lb_id).fg(comfy_table::Color::White),
            Cell::new(address).fg(comfy_table::Color::White),
            Cell::new(action).fg(color),
        ]);
    }
    println!("{}", table);
}
