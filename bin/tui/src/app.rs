use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use sift_client::DeploymentClient;
use sift_session::{ChatSession, SessionConfig};

pub struct App {
    pub session: ChatSession,
    pub input: String,
    pub cursor_position: usize,
    pub scroll_offset: usize,
    pub spinner_index: usize,
    pub total_list_items: usize,
    pub auto_scroll: bool,
}

impl App {
    pub async fn new(client: DeploymentClient, config: SessionConfig) -> Result<Self> {
        let mut session = ChatSession::new(Arc::new(client), config);
        // A deployment without chat history is still usable; start empty.
        if let Err(err) = session.hydrate().await {
            tracing::warn!(%err, "chat history hydration failed, starting empty");
        }
        Ok(Self {
            session,
            input: String::new(),
            cursor_position: 0,
            scroll_offset: 0,
            spinner_index: 0,
            total_list_items: 0,
            auto_scroll: true,
        })
    }

    /// Returns true when the app should exit.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return true;
            }
            KeyCode::Esc if self.session.is_streaming() => {
                self.session.cancel();
            }
            KeyCode::Enter => {
                if !self.input.trim().is_empty() {
                    let query = std::mem::take(&mut self.input);
                    self.cursor_position = 0;
                    self.auto_scroll = true;
                    // Submitting mid-stream cuts the previous turn first.
                    self.session.submit(&query);
                }
            }
            KeyCode::Char(c) => {
                self.input.insert(self.cursor_position, c);
                self.cursor_position += c.len_utf8();
            }
            KeyCode::Backspace => {
                if self.cursor_position > 0 {
                    let previous = previous_char_boundary(&self.input, self.cursor_position);
                    self.input.remove(previous);
                    self.cursor_position = previous;
                }
            }
            KeyCode::Delete => {
                if self.cursor_position < self.input.len() {
                    self.input.remove(self.cursor_position);
                }
            }
            KeyCode::Left => {
                if self.cursor_position > 0 {
                    self.cursor_position = previous_char_boundary(&self.input, self.cursor_position);
                }
            }
            KeyCode::Right => {
                if self.cursor_position < self.input.len() {
                    self.cursor_position = next_char_boundary(&self.input, self.cursor_position);
                }
            }
            KeyCode::Home => {
                self.cursor_position = 0;
            }
            KeyCode::End => {
                self.cursor_position = self.input.len();
            }
            KeyCode::Up => {
                if self.scroll_offset > 0 {
                    self.scroll_offset -= 1;
                    self.auto_scroll = false;
                }
            }
            KeyCode::Down => {
                self.scroll_down(1);
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
                self.auto_scroll = false;
            }
            KeyCode::PageDown => {
                self.scroll_down(10);
            }
            _ => {}
        }
        false
    }

    pub fn handle_mouse_event(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3);
                self.auto_scroll = false;
            }
            MouseEventKind::ScrollDown => {
                self.scroll_down(3);
            }
            _ => {}
        }
    }

    pub fn on_tick(&mut self) {
        if self.session.is_streaming() {
            self.spinner_index = (self.spinner_index + 1) % 10;
        }
        self.session.update();
    }

    fn scroll_down(&mut self, lines: usize) {
        let visible_height = 20;
        let max_offset = self.total_list_items.saturating_sub(visible_height);
        self.scroll_offset = (self.scroll_offset + lines).min(max_offset);
        self.auto_scroll = self.scroll_offset >= max_offset;
    }
}

fn previous_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index - 1;
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index + 1;
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
