use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use sift_session::{NO_ENTITY_TAG, Sender, TagSpan};

use crate::app::App;

const MAX_WIDTH: u16 = 110;
const SPINNER_FRAMES: [&str; 4] = ["▖", "▘", "▝", "▗"];

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = center_area(f.area(), MAX_WIDTH);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .title_bottom(" <↑ ↓> scroll • <esc> stop • <ctrl-c> quit ")
        .title_alignment(ratatui::layout::Alignment::Center);
    f.render_widget(outer_block.clone(), area);

    let inner_area = outer_block.inner(area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(inner_area);

    draw_messages(f, app, chunks[0]);
    draw_input(f, app, chunks[1]);
}

fn center_area(area: Rect, max_width: u16) -> Rect {
    let width = area.width.min(max_width);
    let x = (area.width.saturating_sub(width)) / 2;
    Rect {
        x: area.x + x,
        y: area.y,
        width,
        height: area.height,
    }
}

fn draw_messages(f: &mut Frame, app: &mut App, area: Rect) {
    let padded_area = Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: area.height.saturating_sub(1),
    };
    let text_width = (padded_area.width as usize).saturating_sub(2).max(20);

    let conversation = app.session.conversation();
    let mut list_items: Vec<ListItem> = Vec::new();

    for (i, msg) in conversation.messages().iter().enumerate() {
        let mut header = match msg.sender {
            Sender::Human => vec![Span::styled(
                "You",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )],
            Sender::Ai => vec![Span::styled(
                "AI",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )],
        };
        header.push(Span::styled(
            format!("  {}", msg.timestamp),
            Style::default().fg(Color::DarkGray),
        ));
        if msg.sender == Sender::Human {
            if let Some(sentiment) = conversation.sentiment(i) {
                header.push(Span::styled(
                    format!("  [sentiment: {sentiment}]"),
                    Style::default().fg(sentiment_color(sentiment)),
                ));
            }
        }
        list_items.push(ListItem::new(Line::from(header)));

        match conversation.annotation(i) {
            Some(spans) => {
                for line in flow_spans(spans, text_width) {
                    list_items.push(ListItem::new(line));
                }
            }
            None => {
                for line in wrap(&msg.content, text_width) {
                    list_items.push(ListItem::new(Line::from(line.into_owned())));
                }
            }
        }

        if msg.is_streaming {
            let spinner = SPINNER_FRAMES[app.spinner_index % SPINNER_FRAMES.len()];
            list_items.push(ListItem::new(Line::from(Span::styled(
                spinner,
                Style::default().fg(Color::Cyan),
            ))));
        }

        for reference in &msg.references {
            list_items.push(ListItem::new(Line::from(Span::styled(
                format!("  ▪ {}", reference.source),
                Style::default().fg(Color::DarkGray),
            ))));
        }

        if i + 1 < conversation.len() {
            list_items.push(ListItem::new(Line::from("")));
        }
    }

    app.total_list_items = list_items.len();
    let visible_items = padded_area.height as usize;

    if app.auto_scroll && app.total_list_items > visible_items {
        app.scroll_offset = app.total_list_items.saturating_sub(visible_items);
    }
    let max_offset = app.total_list_items.saturating_sub(visible_items);
    app.scroll_offset = app.scroll_offset.min(max_offset);

    let start = app.scroll_offset;
    let end = (start + visible_items).min(list_items.len());
    let messages_list = List::new(list_items[start..end].to_vec());
    f.render_widget(messages_list, padded_area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(ratatui::widgets::BorderType::Rounded)
        .style(Style::default().fg(if app.session.is_streaming() {
            Color::Cyan
        } else {
            Color::White
        }));

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::White))
        .block(input_block.clone())
        .wrap(Wrap { trim: false });
    f.render_widget(input, area);

    let inner_area = input_block.inner(area);
    let cursor_x = inner_area.x + app.input[..app.cursor_position].width() as u16;
    f.set_cursor_position((
        cursor_x.min(inner_area.x + inner_area.width.saturating_sub(1)),
        inner_area.y,
    ));
}

/// Lay annotated spans out into colored wrapped lines. Tagged spans get a
/// trailing `(TAG)` marker the way the dashboard rendered them.
fn flow_spans(spans: &[TagSpan], max_width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for span in spans {
        let style = tag_style(&span.tag);
        let mut words: Vec<String> = span
            .text
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if span.tag != NO_ENTITY_TAG {
            words.push(format!("({})", span.tag));
        }
        for word in words {
            let word_width = word.width() + 1;
            if current_width + word_width > max_width && !current.is_empty() {
                lines.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
            }
            current.push(Span::styled(format!("{word} "), style));
            current_width += word_width;
        }
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn tag_style(tag: &str) -> Style {
    let color = match tag {
        "PHONENUMBER" => Some(Color::Blue),
        "SSN" => Some(Color::Yellow),
        "CREDITCARDNUMBER" => Some(Color::Red),
        "LOCATION" => Some(Color::Green),
        "NAME" => Some(Color::Magenta),
        NO_ENTITY_TAG => None,
        _ => Some(Color::Cyan),
    };
    match color {
        Some(color) => Style::default().fg(color),
        None => Style::default(),
    }
}

fn sentiment_color(sentiment: &str) -> Color {
    match sentiment {
        "positive" => Color::Green,
        "neutral" => Color::Yellow,
        "negative" => Color::Red,
        _ => Color::DarkGray,
    }
}
