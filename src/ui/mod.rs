pub mod app;
pub mod components;

use crate::ui::app::{App, AppState};
use crate::ui::components::{
    render_cache_list, render_details, render_footer, render_header, render_popup,
    render_scanning,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::prelude::*;
use std::rc::Rc;
use std::time::Duration;

/// Below this width the details pane moves under the list.
const SIDE_BY_SIDE_MIN_WIDTH: u16 = 110;
const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .split(f.area());

    render_header(f, app, chunks[0]);

    if let AppState::Scanning = app.state {
        render_scanning(f, app, chunks[1]);
    } else {
        let panes = split_panes(chunks[1]);
        render_cache_list(f, app, panes[0]);
        render_details(f, app, panes[1]);
    }

    render_footer(f, app, chunks[2]);
    render_popup(f, app);
}

/// List and details side by side on wide terminals, stacked otherwise.
fn split_panes(area: Rect) -> Rc<[Rect]> {
    if area.width >= SIDE_BY_SIDE_MIN_WIDTH {
        Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).split(area)
    } else {
        Layout::vertical([Constraint::Min(5), Constraint::Length(8)]).split(area)
    }
}

/// Picks up whatever the scan or deletion worker has sent since the last frame.
fn poll_workers(app: &mut App) {
    match app.state {
        AppState::Cleaning => app.check_cleaning_status(),
        AppState::Scanning => app.check_scan_status(),
        _ => {}
    }
}

/// Applies one key press to the current state.
pub fn handle_key(app: &mut App, code: KeyCode) -> Flow {
    match app.state {
        AppState::Browsing => match code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::Char(' ') => app.toggle(),
            KeyCode::Char('r') => app.start_scan(),
            KeyCode::Char('p') => app.load_packages(),
            KeyCode::Enter if app.total_selected_size() > 0 => {
                app.state = AppState::Confirming;
            }
            _ => {}
        },
        AppState::Confirming => match code {
            KeyCode::Char('y') | KeyCode::Enter => app.clean_selected(),
            KeyCode::Char('n' | 'q') | KeyCode::Esc => app.state = AppState::Browsing,
            _ => {}
        },
        // rm runs to completion
        AppState::Cleaning => {}
        AppState::Scanning => {
            if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
                return Flow::Quit;
            }
        }
        AppState::Done(_) => {
            if matches!(
                code,
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ' | 'q')
            ) {
                app.state = AppState::Browsing;
            }
        }
    }
    Flow::Continue
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stderr>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;
        poll_workers(app);

        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key(app, key.code) == Flow::Quit
        {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::Allowlist;
    use crate::cleaner::Cleaner;
    use crate::model::CacheEntry;
    use crate::probe::testing::FixedProbe;
    use crate::scanner::{Orchestrator, ScanOptions};
    use crate::service::CacheService;
    use crate::sidecar::PlainText;
    use std::path::Path;
    use std::sync::Arc;

    fn browsing_app() -> App {
        let home = Path::new("/nonexistent/devsweep-keys-test");
        let service = Arc::new(CacheService::from_parts(
            Orchestrator::new(
                home.to_path_buf(),
                Box::new(FixedProbe::default()),
                Box::new(PlainText),
                Allowlist::default(),
            ),
            Cleaner::new(home.to_path_buf(), Allowlist::default()),
        ));
        let mut app = App::new_scanning(service, ScanOptions::default());
        app.rows = app::rows_for(&{
            let orchestrator = Orchestrator::new(
                home.to_path_buf(),
                Box::new(FixedProbe::default()),
                Box::new(PlainText),
                Allowlist::default(),
            );
            let mut result = orchestrator.run_scan(ScanOptions::default(), &|_| {});
            result.top_general = vec![
                CacheEntry::new(home.join("Library/Caches/com.a"), "1G"),
                CacheEntry::new(home.join("Library/Caches/com.b"), "1M"),
            ];
            result
        });
        app.list_state.select(Some(0));
        app.state = AppState::Browsing;
        app
    }

    #[test]
    fn enter_without_selection_stays_browsing() {
        let mut app = browsing_app();
        assert_eq!(handle_key(&mut app, KeyCode::Enter), Flow::Continue);
        assert!(matches!(app.state, AppState::Browsing));
    }

    #[test]
    fn confirm_can_be_cancelled() {
        let mut app = browsing_app();
        handle_key(&mut app, KeyCode::Char(' '));
        handle_key(&mut app, KeyCode::Enter);
        assert!(matches!(app.state, AppState::Confirming));

        handle_key(&mut app, KeyCode::Esc);
        assert!(matches!(app.state, AppState::Browsing));
        assert_eq!(app.total_selected_size(), 1024 * 1024 * 1024);
    }

    #[test]
    fn quit_only_from_idle_states() {
        let mut app = browsing_app();
        app.state = AppState::Cleaning;
        assert_eq!(handle_key(&mut app, KeyCode::Char('q')), Flow::Continue);

        app.state = AppState::Done("ok".to_string());
        assert_eq!(handle_key(&mut app, KeyCode::Char('q')), Flow::Continue);
        assert!(matches!(app.state, AppState::Browsing));
        assert_eq!(handle_key(&mut app, KeyCode::Char('q')), Flow::Quit);
    }

    #[test]
    fn narrow_terminals_stack_panes() {
        let wide = split_panes(Rect::new(0, 0, 120, 30));
        assert_eq!(wide[0].y, wide[1].y);

        let narrow = split_panes(Rect::new(0, 0, 80, 30));
        assert_eq!(narrow[0].x, narrow[1].x);
        assert!(narrow[1].y > narrow[0].y);
    }
}
