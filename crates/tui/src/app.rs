use std::{cmp, io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use fleetdesk_core::{ClientSession, FleetLedger, LedgerError, LedgerResult};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 64;

const HOME_ITEMS: [&str; 3] = ["Admin Login", "Client Login", "Exit"];
const ADMIN_ITEMS: [&str; 7] = [
    "Add Vehicle",
    "View Vehicles",
    "Add Client",
    "View Clients",
    "Assign Vehicle",
    "View All Bookings",
    "Logout",
];
const CLIENT_ITEMS: [&str; 4] = [
    "View Available Vehicles",
    "Request Transport",
    "My Bookings",
    "Logout",
];

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Admin,
    Client,
}

impl Screen {
    fn items(self) -> &'static [&'static str] {
        match self {
            Self::Home => &HOME_ITEMS,
            Self::Admin => &ADMIN_ITEMS,
            Self::Client => &CLIENT_ITEMS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
    ClientLogin,
    AddVehicle,
    AddClient,
    AssignVehicle,
    RequestTransport,
}

impl FormKind {
    fn title(self) -> &'static str {
        match self {
            Self::ClientLogin => "Client Login",
            Self::AddVehicle => "Add Vehicle",
            Self::AddClient => "Add Client",
            Self::AssignVehicle => "Assign Vehicle",
            Self::RequestTransport => "Request Transport",
        }
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            Self::ClientLogin => &["Client ID"],
            Self::AddVehicle => &["Vehicle ID", "Vehicle Type (Bus/Truck/Car)"],
            Self::AddClient => &["Client ID", "Name", "Contact Number"],
            Self::AssignVehicle => &["Client ID", "Vehicle ID"],
            Self::RequestTransport => &["Vehicle ID"],
        }
    }
}

#[derive(Debug, Clone, Default)]
struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    /// Byte offset of the char at `cursor`.
    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map_or(self.value.len(), |(idx, _)| idx)
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_to_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if self.char_len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.value.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }
}

#[derive(Debug, Clone)]
struct FormModal {
    kind: FormKind,
    hint: Option<String>,
    fields: Vec<TextInput>,
    focus: usize,
}

impl FormModal {
    fn new(kind: FormKind) -> Self {
        Self {
            kind,
            hint: None,
            fields: vec![TextInput::default(); kind.labels().len()],
            focus: 0,
        }
    }

    fn with_hint(mut self, hint: String) -> Self {
        self.hint = Some(hint);
        self
    }

    fn focused(&mut self) -> &mut TextInput {
        &mut self.fields[self.focus]
    }

    fn on_last_field(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    fn move_focus(&mut self, delta: isize) {
        let last = self.fields.len().saturating_sub(1) as isize;
        self.focus = (self.focus as isize + delta).clamp(0, last) as usize;
    }

    /// Trimmed field values in label order.
    fn values(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.value.trim().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Popup {
    title: String,
    lines: Vec<String>,
    tone: Tone,
    scroll: usize,
}

impl Popup {
    fn new(title: impl Into<String>, lines: Vec<String>, tone: Tone) -> Self {
        Self {
            title: title.into(),
            lines,
            tone,
            scroll: 0,
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.lines.len().saturating_sub(1) as isize;
        self.scroll = (self.scroll as isize + delta).clamp(0, max) as usize;
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front end for the fleet ledger.
pub struct FleetApp {
    ledger: FleetLedger,
    screen: Screen,
    menu_cursor: usize,
    session: Option<ClientSession>,
    form: Option<FormModal>,
    popup: Option<Popup>,
    status: String,
    should_quit: bool,
    theme: Theme,
}

impl FleetApp {
    pub fn new(ledger: FleetLedger) -> Self {
        Self {
            ledger,
            screen: Screen::Home,
            menu_cursor: 0,
            session: None,
            form: None,
            popup: None,
            status: "Ready".to_string(),
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        info!("Portal started");

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    self.handle_key(key)
                }
                Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => {}
                None => break,
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Portal closed");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.popup.is_some() {
            self.handle_popup_key(key);
        } else if self.form.is_some() {
            self.handle_form_key(key);
        } else {
            self.handle_menu_key(key);
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) {
        let Some(popup) = self.popup.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.popup = None,
            KeyCode::Char('j') | KeyCode::Down => popup.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => popup.scroll_by(-1),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut submit = false;
        if let Some(form) = self.form.as_mut() {
            match key.code {
                KeyCode::Esc => {
                    let title = form.kind.title();
                    self.form = None;
                    self.set_status(format!("{title} cancelled"));
                    return;
                }
                KeyCode::Enter if form.on_last_field() => submit = true,
                KeyCode::Enter | KeyCode::Tab | KeyCode::Down => form.move_focus(1),
                KeyCode::BackTab | KeyCode::Up => form.move_focus(-1),
                KeyCode::Left => form.focused().move_cursor(-1),
                KeyCode::Right => form.focused().move_cursor(1),
                KeyCode::Home => form.focused().cursor = 0,
                KeyCode::End => form.focused().move_to_end(),
                KeyCode::Backspace => form.focused().backspace(),
                KeyCode::Delete => form.focused().delete(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        form.focused().insert(ch);
                    }
                }
                _ => {}
            }
        }

        if submit {
            if let Some(form) = self.form.take() {
                self.submit_form(form);
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.move_menu_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_menu_cursor(-1),
            KeyCode::Enter => self.activate_menu_item(),
            KeyCode::Esc | KeyCode::Char('q') => match self.screen {
                Screen::Home => self.should_quit = true,
                Screen::Admin => self.go_home("Logged out of admin dashboard"),
                Screen::Client => self.logout_client(),
            },
            _ => {}
        }
    }

    fn move_menu_cursor(&mut self, delta: isize) {
        let last = self.screen.items().len().saturating_sub(1) as isize;
        self.menu_cursor = (self.menu_cursor as isize + delta).clamp(0, last) as usize;
    }

    fn activate_menu_item(&mut self) {
        match (self.screen, self.menu_cursor) {
            (Screen::Home, 0) => {
                self.screen = Screen::Admin;
                self.menu_cursor = 0;
                self.set_status("Admin dashboard".to_string());
            }
            (Screen::Home, 1) => self.form = Some(FormModal::new(FormKind::ClientLogin)),
            (Screen::Home, _) => self.should_quit = true,

            (Screen::Admin, 0) => self.form = Some(FormModal::new(FormKind::AddVehicle)),
            (Screen::Admin, 1) => self.show_listing(
                "All Vehicles",
                "No vehicles found.",
                self.ledger.list_vehicles().map(to_lines),
            ),
            (Screen::Admin, 2) => self.form = Some(FormModal::new(FormKind::AddClient)),
            (Screen::Admin, 3) => self.show_listing(
                "All Clients",
                "No clients found.",
                self.ledger.list_clients().map(to_lines),
            ),
            (Screen::Admin, 4) => self.form = Some(FormModal::new(FormKind::AssignVehicle)),
            (Screen::Admin, 5) => self.show_listing(
                "All Bookings",
                "No bookings found.",
                self.ledger.list_bookings().map(to_lines),
            ),
            (Screen::Admin, _) => self.go_home("Logged out of admin dashboard"),

            (Screen::Client, 0) => self.show_listing(
                "Available Vehicles",
                "No available vehicles right now.",
                self.ledger.list_available_vehicles().map(|vehicles| {
                    vehicles
                        .iter()
                        .map(|vehicle| vehicle.availability_line())
                        .collect()
                }),
            ),
            (Screen::Client, 1) => self.open_request_form(),
            (Screen::Client, 2) => self.show_my_bookings(),
            (Screen::Client, _) => self.logout_client(),
        }
    }

    fn open_request_form(&mut self) {
        if self.session.is_none() {
            self.show_error("Error", "No client logged in.".to_string());
            return;
        }
        match self.ledger.list_available_vehicles() {
            Ok(vehicles) if vehicles.is_empty() => {
                self.popup = Some(Popup::new(
                    "Info",
                    vec!["No available vehicles right now.".to_string()],
                    Tone::Info,
                ));
            }
            Ok(vehicles) => {
                let ids: Vec<&str> = vehicles
                    .iter()
                    .map(|vehicle| vehicle.vehicle_id.as_str())
                    .collect();
                let hint = format!("Available: {}", ids.join(", "));
                self.form = Some(FormModal::new(FormKind::RequestTransport).with_hint(hint));
            }
            Err(err) => self.report_error(err),
        }
    }

    fn show_my_bookings(&mut self) {
        let Some(session) = self.session.clone() else {
            self.show_error("Error", "No client logged in.".to_string());
            return;
        };
        let lines = self
            .ledger
            .list_bookings_for_client(&session.client_id)
            .map(|bookings| {
                bookings
                    .iter()
                    .map(|booking| booking.vehicle_line())
                    .collect()
            });
        self.show_listing("My Bookings", "No bookings yet.", lines);
    }

    fn submit_form(&mut self, form: FormModal) {
        let values = form.values();
        let field = |idx: usize| values.get(idx).map(String::as_str).unwrap_or_default();

        let outcome: LedgerResult<String> = match form.kind {
            FormKind::ClientLogin => self.ledger.login_client(field(0)).map(|session| {
                let greeting = session.greeting();
                self.session = Some(session);
                self.screen = Screen::Client;
                self.menu_cursor = 0;
                greeting
            }),
            FormKind::AddVehicle => self
                .ledger
                .add_vehicle(field(0), field(1))
                .map(|_| "Vehicle added successfully.".to_string()),
            FormKind::AddClient => {
                let contact = Some(field(2)).filter(|value| !value.is_empty());
                self.ledger
                    .add_client(field(0), field(1), contact)
                    .map(|_| "Client added successfully.".to_string())
            }
            FormKind::AssignVehicle => self
                .ledger
                .assign_vehicle(field(0), field(1))
                .map(|_| "Vehicle assigned to client.".to_string()),
            FormKind::RequestTransport => match self.session.clone() {
                Some(session) => self
                    .ledger
                    .request_transport(&session.client_id, field(0))
                    .map(|_| "Vehicle booked successfully!".to_string()),
                None => {
                    self.show_error("Error", "No client logged in.".to_string());
                    return;
                }
            },
        };

        match outcome {
            Ok(message) if form.kind == FormKind::ClientLogin => self.set_status(message),
            Ok(message) => {
                self.set_status(message.clone());
                self.popup = Some(Popup::new("Success", vec![message], Tone::Success));
            }
            Err(err) => self.report_error(err),
        }
    }

    fn show_listing(&mut self, title: &str, empty: &str, lines: LedgerResult<Vec<String>>) {
        match lines {
            Ok(lines) if lines.is_empty() => {
                self.popup = Some(Popup::new(title, vec![empty.to_string()], Tone::Info));
            }
            Ok(lines) => {
                self.set_status(format!("{title}: {} entries", lines.len()));
                self.popup = Some(Popup::new(title, lines, Tone::Info));
            }
            Err(err) => self.report_error(err),
        }
    }

    fn report_error(&mut self, err: LedgerError) {
        let title = match &err {
            LedgerError::Validation(_) | LedgerError::Duplicate { .. } => "Warning",
            LedgerError::NotFound { .. } | LedgerError::Conflict(_) => "Error",
            LedgerError::Storage(_) => {
                error!(?err, "Storage operation failed");
                "Storage Error"
            }
        };
        let tone = if title == "Warning" {
            Tone::Warning
        } else {
            Tone::Error
        };
        let message = err.to_string();
        self.set_status(message.clone());
        self.popup = Some(Popup::new(title, vec![message], tone));
    }

    fn show_error(&mut self, title: &str, message: String) {
        self.set_status(message.clone());
        self.popup = Some(Popup::new(title, vec![message], Tone::Error));
    }

    fn logout_client(&mut self) {
        if let Some(session) = self.session.take() {
            info!(client_id = %session.client_id, "Client logged out");
        }
        self.go_home("Logged out");
    }

    fn go_home(&mut self, status: &str) {
        self.screen = Screen::Home;
        self.menu_cursor = 0;
        self.set_status(status.to_string());
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        self.render_menu(frame, layout[1]);
        self.render_status(frame, layout[2]);

        if let Some(form) = &self.form {
            self.render_form(frame, form);
        }
        if let Some(popup) = &self.popup {
            self.render_popup(frame, popup);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let subtitle = match (self.screen, &self.session) {
            (Screen::Admin, _) => "Admin Dashboard".to_string(),
            (Screen::Client, Some(session)) => session.greeting(),
            _ => "Transportation Management Portal".to_string(),
        };
        let header = Paragraph::new(Line::from(Span::styled(
            subtitle,
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("fleetdesk"));
        frame.render_widget(header, area);
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let items = self.screen.items();
        let height = (items.len() as u16).saturating_add(2).min(area.height);
        let width = 32.min(area.width.max(1));
        let menu_area = centered_rect(width, height, area);

        let lines: Vec<Line> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                if idx == self.menu_cursor {
                    Line::from(Span::styled(
                        format!("▶ {item}"),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("  {item}"),
                        Style::default().fg(self.theme.primary_fg),
                    ))
                }
            })
            .collect();

        let menu = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Menu"));
        frame.render_widget(menu, menu_area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let help = Span::styled(
            "  j/k move · Enter select · Esc back · q quit",
            Style::default().fg(self.theme.muted),
        );
        let paragraph = Paragraph::new(Line::from(vec![Span::raw(self.status.clone()), help]))
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_form(&self, frame: &mut Frame, form: &FormModal) {
        let frame_area = frame.size();
        let labels = form.kind.labels();
        let hint_rows = u16::from(form.hint.is_some());
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24);
        let height = (labels.len() as u16 * 2 + hint_rows + 4).min(frame_area.height);
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let mut lines = Vec::new();
        if let Some(hint) = &form.hint {
            lines.push(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(self.theme.muted),
            )));
        }
        for (idx, (label, field)) in labels.iter().zip(&form.fields).enumerate() {
            let marker = if idx == form.focus { "> " } else { "  " };
            lines.push(Line::from(*label));
            lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(self.theme.accent)),
                Span::raw(field.value.clone()),
            ]));
        }
        lines.push(Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" next/submit  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form.kind.title()))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let field = &form.fields[form.focus];
        let cursor_x =
            (area.x + 3 + field.cursor as u16).min(area.x + area.width.saturating_sub(2));
        let cursor_y = area.y + 1 + hint_rows + form.focus as u16 * 2 + 1;
        frame.set_cursor(cursor_x, cursor_y.min(area.y + area.height.saturating_sub(2)));
    }

    fn render_popup(&self, frame: &mut Frame, popup: &Popup) {
        let frame_area = frame.size();
        let longest = popup.lines.iter().map(|line| line.len()).max().unwrap_or(0) as u16;
        let width = longest
            .saturating_add(4)
            .clamp(30, frame_area.width.saturating_sub(4).max(30));
        let height = (popup.lines.len() as u16)
            .saturating_add(3)
            .min(frame_area.height.saturating_sub(2).max(4));
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let color = match popup.tone {
            Tone::Info => self.theme.accent,
            Tone::Success => self.theme.success,
            Tone::Warning => self.theme.warning,
            Tone::Error => self.theme.danger,
        };
        let lines: Vec<Line> = popup
            .lines
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect();
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title(popup.title.clone()),
            )
            .scroll((popup.scroll as u16, 0))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }
}

fn to_lines<T: ToString>(items: Vec<T>) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
