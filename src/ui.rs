use std::time::{Duration, Instant};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell as TuiCell, Clear, Paragraph, Row as TuiRow, Table, TableState, Wrap},
};

use gridview::domain::{CMDMode, TVConfig};
use gridview::engine::{PageView, TableSnapshot};
use gridview::pagination::PaginationBar;
use gridview::render::{Cell, Tone};

use crate::model::{Model, UIData};

pub const CMDLINE_HEIGH: u16 = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
pub const MAX_COLUMN_WIDTH: usize = 40;
const ACTIONS_LABEL: &str = "Actions";
const ACTIONS_TEXT: &str = "Edit | Delete";
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct TableUI {
    started: Instant,
}

impl TableUI {
    pub fn new(_config: &TVConfig) -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [header, filter_bar, table_area, summary, pager, cmdline] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        match &uidata.snapshot {
            TableSnapshot::Loading => self.draw_spinner(frame, table_area),
            TableSnapshot::Ready(page) => {
                self.draw_header(frame, header, page);
                self.draw_filter_bar(frame, filter_bar, page, uidata);
                self.draw_table(frame, table_area, page, uidata.selected_row);
                frame.render_widget(Paragraph::new(page.summary.to_string()).dark_gray(), summary);
                if let Some(bar) = &page.pagination {
                    frame.render_widget(Paragraph::new(pagination_line(bar)).centered(), pager);
                }
            }
        }
        self.draw_cmdline(frame, cmdline, uidata);

        if let Some(form) = &uidata.form {
            self.draw_form(frame, uidata, form);
        } else if let Some(message) = &uidata.confirm_message {
            self.draw_confirm(frame, message);
        } else if uidata.show_popup {
            self.draw_popup(frame, &uidata.popup_title, &uidata.popup_message);
        }
    }

    fn draw_spinner(&self, frame: &mut Frame, area: Rect) {
        let idx = (self.started.elapsed().as_millis() / 100) as usize % SPINNER.len();
        let [center] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        frame.render_widget(
            Paragraph::new(format!("{} Loading ...", SPINNER[idx])).centered(),
            center,
        );
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect, page: &PageView) {
        frame.render_widget(Paragraph::new(Line::from(page.title.clone().bold())), area);
        let buttons = Line::from(vec![
            "[x]".blue().bold(),
            " Export  ".into(),
            "[a]".blue().bold(),
            format!(" {} ", page.add_button_text).into(),
        ]);
        frame.render_widget(Paragraph::new(buttons).alignment(Alignment::Right), area);
    }

    fn draw_filter_bar(&self, frame: &mut Frame, area: Rect, page: &PageView, uidata: &UIData) {
        let mut spans: Vec<Span> = vec!["Search: ".dark_gray()];
        spans.push(if uidata.search_term.is_empty() {
            "-".into()
        } else {
            uidata.search_term.clone().yellow()
        });
        for input in page.filters.iter() {
            let selected = uidata.selected_column.as_deref() == Some(input.label.as_str());
            let label = format!("  {}: ", input.label);
            spans.push(if selected { label.blue().bold() } else { label.dark_gray() });
            spans.push(if input.value.is_empty() {
                "[ ]".dark_gray()
            } else {
                format!("[{}]", input.value).yellow()
            });
        }
        if let Some(column) = &uidata.selected_column
            && !page.filters.iter().any(|input| &input.label == column)
        {
            spans.push("  Column: ".dark_gray());
            spans.push(column.clone().blue().bold());
        }
        if let Some(sort) = &uidata.sort {
            spans.push("  Sort: ".dark_gray());
            spans.push(sort.clone().into());
        }
        spans.push("  Page size: ".dark_gray());
        spans.push(uidata.page_size.to_string().into());
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_table(&self, frame: &mut Frame, area: Rect, page: &PageView, selected_row: usize) {
        let mut widths: Vec<usize> = page
            .headers
            .iter()
            .map(|h| h.chars().count())
            .collect();
        for row in page.rows.iter() {
            for (width, cell) in widths.iter_mut().zip(row.cells.iter()) {
                *width = (*width).max(cell.as_text().chars().count());
            }
        }
        let mut constraints: Vec<Constraint> = widths
            .iter()
            .map(|w| Constraint::Length((w + COLUMN_WIDTH_MARGIN).min(MAX_COLUMN_WIDTH) as u16))
            .collect();
        constraints.push(Constraint::Length(ACTIONS_TEXT.len() as u16));

        let mut header: Vec<TuiCell> = page.headers.iter().map(|h| TuiCell::from(h.clone())).collect();
        header.push(TuiCell::from(ACTIONS_LABEL));

        let rows: Vec<TuiRow> = match page.empty_message {
            Some(message) => vec![TuiRow::new(vec![TuiCell::from(message.italic().dark_gray())])],
            None => page
                .rows
                .iter()
                .map(|row| {
                    let mut cells: Vec<TuiCell> = row.cells.iter().map(styled_cell).collect();
                    cells.push(TuiCell::from(ACTIONS_TEXT.dark_gray()));
                    TuiRow::new(cells)
                })
                .collect(),
        };

        let table = Table::new(rows, constraints)
            .header(TuiRow::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .block(Block::bordered().border_set(border::PLAIN));

        let mut state = TableState::default();
        if page.empty_message.is_none() {
            state.select(Some(selected_row));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_cmdline(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Search) => "Search: ".to_string(),
                Some(CMDMode::Filter) => format!(
                    "Filter {}: ",
                    uidata.selected_column.clone().unwrap_or_default()
                ),
                None => ": ".to_string(),
            };
            let cursor_x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            let line = Line::from(vec![prompt.blue().bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let status = if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TTL {
                uidata.status_message.clone().into()
            } else {
                uidata.status_message.clone().dark_gray()
            };
            let line = Line::from(vec![status, "  ? help".dark_gray()]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn draw_popup(&self, frame: &mut Frame, title: &str, message: &str) {
        let area = popup_area(frame.area(), 60, 80);
        let block = Block::bordered()
            .title(Line::from(title.to_string().bold()).centered())
            .title_bottom(Line::from(" Esc to close ").centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(Text::from(message.to_string()))
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }

    fn draw_confirm(&self, frame: &mut Frame, message: &str) {
        let area = popup_area(frame.area(), 50, 20);
        let block = Block::bordered()
            .title(Line::from(" Confirm delete ".bold()).centered())
            .border_set(border::THICK)
            .red();
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .centered()
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
    }

    fn draw_form(&self, frame: &mut Frame, uidata: &UIData, form: &crate::model::RecordForm) {
        let area = popup_area(frame.area(), 60, 70);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", form.title).bold()).centered())
            .title_bottom(Line::from(" Tab next field  Enter save  Esc cancel ").centered())
            .border_set(border::THICK);
        let inner = block.inner(area);
        frame.render_widget(Clear, area);
        frame.render_widget(block, area);

        let label_width = form
            .fields
            .iter()
            .map(|f| f.label.chars().count())
            .max()
            .unwrap_or(0)
            + 2;
        let lines: Vec<Line> = form
            .fields
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let label = format!("{:<label_width$}", format!("{}:", field.label));
                if idx == form.selected {
                    Line::from(vec![label.blue().bold(), uidata.cmdinput.input.clone().into()])
                } else {
                    Line::from(vec![label.dark_gray(), field.value.clone().into()])
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);

        if form.selected < inner.height as usize {
            let x = inner.x + (label_width + uidata.cmdinput.curser_pos) as u16;
            let y = inner.y + form.selected as u16;
            frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), y));
        }
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Positive => Color::Green,
        Tone::Negative => Color::Red,
        Tone::Warning => Color::Yellow,
        Tone::Neutral => Color::Blue,
    }
}

fn styled_cell(cell: &Cell) -> TuiCell<'static> {
    match cell {
        Cell::Text(text) => TuiCell::from(text.clone()),
        Cell::Badge { label, tone } => TuiCell::from(Span::styled(
            format!(" {label} "),
            Style::default().fg(Color::Black).bg(tone_color(*tone)),
        )),
        Cell::Placeholder => TuiCell::from(cell.as_text().to_string().dark_gray()),
    }
}

fn pagination_line(bar: &PaginationBar) -> Line<'static> {
    let button = |label: &str, enabled: bool| -> Span<'static> {
        if enabled {
            label.to_string().blue()
        } else {
            label.to_string().dark_gray()
        }
    };
    let mut spans = vec![
        button("« First", bar.first_enabled),
        " ".into(),
        button("‹ Prev", bar.prev_enabled),
        " ".into(),
    ];
    for page in bar.pages.iter() {
        if *page == bar.current_page {
            spans.push(format!("[{page}]").bold().yellow());
        } else {
            spans.push(format!(" {page} ").into());
        }
    }
    spans.push(" ".into());
    spans.push(button("Next ›", bar.next_enabled));
    spans.push(" ".into());
    spans.push(button("Last »", bar.last_enabled));
    Line::from(spans)
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
