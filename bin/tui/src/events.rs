use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
}

/// Bridges crossterm's blocking event loop onto the async runtime. Ticks
/// fire whenever no terminal event arrives within the tick rate.
pub struct EventHandler {
    rx: mpsc::Receiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel(100);
        std::thread::spawn(move || {
            loop {
                let ready = crossterm::event::poll(tick_rate).unwrap_or(false);
                let event = if ready {
                    match crossterm::event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            Some(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Mouse(mouse)) => Some(Event::Mouse(mouse)),
                        Ok(_) => None,
                        Err(_) => break,
                    }
                } else {
                    Some(Event::Tick)
                };
                if let Some(event) = event {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
            }
        });
        Self { rx }
    }

    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("event channel closed"))
    }
}
