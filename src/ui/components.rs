use crate::ui::app::{App, AppState, Row};
use humansize::{BINARY, format_size};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

const BAR_WIDTH: usize = 16;

pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let disk_info = app
        .disks
        .list()
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"));

    let disk_text = if let Some(disk) = disk_info {
        let total = disk.total_space();
        let available = disk.available_space();
        let used = total.saturating_sub(available);
        let percent = if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                (used as f64 / total as f64) * 100.0
            }
        } else {
            0.0
        };

        format!(
            "Disk: {} / {} ({percent:.1}% Used)",
            format_size(used, BINARY),
            format_size(total, BINARY)
        )
    } else {
        "Disk: N/A".to_string()
    };

    let reclaimable = app.result.as_ref().map_or_else(
        || "scanning".to_string(),
        |r| format!("{} ({} scan)", r.grand_total(), r.mode.name()),
    );

    let header_text = format!(
        "devsweep v{} | {disk_text} | Reclaimable: {reclaimable}",
        env!("CARGO_PKG_VERSION")
    );
    let title = Paragraph::new(header_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

pub fn render_scanning(f: &mut Frame, app: &App, area: Rect) {
    let status = app
        .phase
        .map_or("Preparing scan...", |phase| phase.label());
    let text = format!(
        "{status}\n\nHome: {}\nMode: {}{}",
        app.home().display(),
        app.options.mode.name(),
        if app.options.include_packages {
            ", with package versions"
        } else {
            ""
        }
    );
    let body = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Scanning"))
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

pub fn render_cache_list(f: &mut Frame, app: &mut App, area: Rect) {
    let max = app.max_row_size();
    let items: Vec<ListItem> = app
        .rows
        .iter()
        .map(|row| {
            let checkbox = if app.is_selected(row) { "[x]" } else { "[ ]" };
            let indent = if row.depth > 0 { "  " } else { "" };
            let name = format!("{indent}{}", row.item.display_name());
            let content = format!(
                "{checkbox} {:<10} {name:<36} {:>10} {}",
                row.group,
                row.item.entry().size,
                bar(row.item.entry().size_bytes(), max)
            );
            ListItem::new(content)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Caches"))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Yellow),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut app.list_state);
}

pub fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let Some(row) = app.highlighted() else {
        f.render_widget(
            Block::default().borders(Borders::ALL).title("Details"),
            area,
        );
        return;
    };

    let details = Paragraph::new(details_text(row))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Details: {}", row.item.display_name())),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(details, area);
}

fn details_text(row: &Row) -> String {
    let entry = row.item.entry();
    format!(
        "{}\n\nSize: {}\nPath: {}",
        row.item.description(),
        entry.size,
        entry.path.display()
    )
}

/// Proportional bar, at least one cell for any non-empty entry.
fn bar(bytes: u64, max: u64) -> String {
    if bytes == 0 || max == 0 {
        return String::new();
    }
    let cells = u128::from(bytes) * BAR_WIDTH as u128 / u128::from(max);
    let cells = usize::try_from(cells).unwrap_or(BAR_WIDTH).clamp(1, BAR_WIDTH);
    "█".repeat(cells)
}

pub fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let total_selected = app.total_selected_size();
    let footer_text = match app.state {
        AppState::Browsing => format!(
            "Total Selected: {} | [Space] Toggle [Enter] Delete [r] Rescan [p] Packages [q] Quit",
            format_size(total_selected, BINARY)
        ),
        AppState::Confirming => format!(
            "PERMANENTLY DELETE {}? | [y/Enter] Confirm [n/Esc] Cancel",
            format_size(total_selected, BINARY)
        ),
        AppState::Cleaning => "Deleting... (This may take a while)".to_string(),
        AppState::Scanning => "Scanning... [q] Quit".to_string(),
        AppState::Done(_) => "Done! [Press key to continue]".to_string(),
    };

    let footer = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

pub fn render_popup(f: &mut Frame, app: &App) {
    if let AppState::Done(ref msg) = app.state {
        let block = Block::default().title("Clean Completed").borders(Borders::ALL);
        let area = centered_rect(60, 20, f.area());
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(msg.clone())
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_largest() {
        assert_eq!(bar(0, 100), "");
        assert_eq!(bar(100, 0), "");
        assert_eq!(bar(100, 100).chars().count(), BAR_WIDTH);
        assert_eq!(bar(50, 100).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(1, u64::MAX).chars().count(), 1);
    }
}
