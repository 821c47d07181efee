use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ram_core::{
    EnergyLevel, HistoryStore, ItemStore, Sequencer, SessionState, TunnelSession, commit_step,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use tracing::warn;

/// Focus-queue screen state, independent of the terminal.
pub struct TunnelApp<S> {
    store: S,
    session: TunnelSession,
    done_count: usize,
    status: Option<String>,
}

impl<S> TunnelApp<S> {
    pub fn session(&self) -> &TunnelSession {
        &self.session
    }
}

impl<S: ItemStore + HistoryStore> TunnelApp<S> {
    pub fn new(store: S, sequencer: Sequencer) -> Self {
        Self {
            store,
            session: TunnelSession::new(sequencer),
            done_count: 0,
            status: None,
        }
    }

    pub fn declare(&mut self, energy: EnergyLevel) -> Result<()> {
        let tasks = self.store.list_active_tasks()?;
        let history = self.store.get()?;
        match self.session.declare_energy(energy, tasks, &history) {
            Ok(_) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
        Ok(())
    }

    /// Returns true when the screen should close.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let energy = match code {
            KeyCode::Char('h') => Some(EnergyLevel::High),
            KeyCode::Char('m') => Some(EnergyLevel::Medium),
            KeyCode::Char('l') => Some(EnergyLevel::Low),
            _ => None,
        };
        if let Some(e) = energy {
            if !self.session.state().is_terminal() {
                self.declare(e)?;
            }
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.session.exit();
                Ok(true)
            }
            KeyCode::Enter if self.session.state() == SessionState::Exhausted => {
                self.session.exit();
                Ok(true)
            }
            KeyCode::Char('d') => {
                let history = self.store.get()?;
                match self.session.complete(&history, Utc::now()) {
                    Ok(step) => {
                        commit_step(&mut self.store, &step)?;
                        self.done_count += 1;
                        self.status = Some("Nice. One less thing.".to_string());
                    }
                    Err(e) => self.status = Some(e.to_string()),
                }
                Ok(false)
            }
            KeyCode::Char('s') => {
                let history = self.store.get()?;
                match self.session.skip(&history, Utc::now()) {
                    Ok(step) => {
                        commit_step(&mut self.store, &step)?;
                        self.status = Some("Skipped. It'll come back around.".to_string());
                    }
                    Err(e) => self.status = Some(e.to_string()),
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}

pub fn run_tunnel<S: ItemStore + HistoryStore>(
    store: S,
    sequencer: Sequencer,
    energy: Option<EnergyLevel>,
) -> Result<usize> {
    let mut app = TunnelApp::new(store, sequencer);
    if let Some(e) = energy {
        app.declare(e)?;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = tunnel_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map(|_| app.done_count)
}

fn tunnel_loop<S: ItemStore + HistoryStore>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TunnelApp<S>,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key.code) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, "tunnel action failed");
                        app.status = Some(format!("error: {e:#}"));
                    }
                }
            }
        }
    }
    Ok(())
}

fn draw<S>(f: &mut Frame, app: &TunnelApp<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(4)])
        .split(f.area());

    let energy = app
        .session()
        .energy()
        .map(|e| e.as_str().to_string())
        .unwrap_or_else(|| "?".to_string());
    let position = match app.session().position() {
        Some((i, n)) => format!("{i} / {n}"),
        None => String::new(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("RAM tunnel", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        Span::raw(format!("   energy: {energy}   {position}   done: {}", app.done_count)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let body: Text = match app.session().state() {
        SessionState::AwaitingEnergy => Text::from(vec![
            Line::raw(""),
            Line::styled("How's your energy right now?", Style::default().add_modifier(Modifier::BOLD)),
            Line::raw(""),
            Line::raw("[h] high   [m] medium   [l] low"),
        ]),
        SessionState::Presenting { .. } => match app.session().current() {
            Some(task) => {
                let mut lines = vec![
                    Line::raw(""),
                    Line::styled(
                        task.processed_text.clone(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Line::raw(""),
                    Line::styled(
                        format!("energy {}  ·  urgency {}", task.energy.as_str(), task.urgency.as_str()),
                        Style::default().fg(Color::Gray),
                    ),
                ];
                if let Some(cue) = &task.temporal_cue {
                    lines.push(Line::styled(format!("when: {cue}"), Style::default().fg(Color::Gray)));
                }
                if !task.tags.is_empty() {
                    lines.push(Line::styled(
                        format!("#{}", task.tags.join(" #")),
                        Style::default().fg(Color::Magenta),
                    ));
                }
                Text::from(lines)
            }
            None => Text::raw(""),
        },
        SessionState::Exhausted => Text::from(vec![
            Line::raw(""),
            Line::styled("All clear.", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Line::raw("Nothing left in the tunnel. Go dump something new, or rest."),
        ]),
        SessionState::Exited => Text::raw(""),
    };
    let body = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("one thing at a time"));
    f.render_widget(body, chunks[1]);

    let keys = match app.session().state() {
        SessionState::Presenting { .. } => "d=done  s=skip  h/m/l=re-declare energy  q=exit",
        SessionState::Exhausted => "Enter/q=exit",
        _ => "h/m/l=pick energy  q=exit",
    };
    let mut footer = vec![Line::styled(keys, Style::default().fg(Color::Gray))];
    if let Some(s) = &app.status {
        footer.push(Line::raw(s.clone()));
    }
    let footer = Paragraph::new(Text::from(footer)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}
