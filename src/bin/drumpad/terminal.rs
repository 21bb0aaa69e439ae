//! Terminal front end: keyboard and paste input, half-block rendering of the canvas.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode, supports_keyboard_enhancement,
};
use crossterm::{execute, queue};
use drumpad::event_loop::{Frame, Presenter};
use drumpad::input::{InputEvent, PadInput};
use drumpad::messages::EngineEvent;
use drumpad::visualizer::canvas::{Canvas, Rgb};

/// Raw mode plus alternate screen; restored on drop.
pub struct TerminalSession {
    keyboard_enhanced: bool,
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, Hide)?;

        // Key release events are only reported with the kitty keyboard protocol.
        let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
        if keyboard_enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        Ok(Self { keyboard_enhanced })
    }

    pub fn reports_key_releases(&self) -> bool {
        self.keyboard_enhanced
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.keyboard_enhanced {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, Show, DisableBracketedPaste, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Reads terminal events and forwards them to the event loop until quit.
pub fn spawn_input_thread(
    input: PadInput,
    sender: Sender<EngineEvent>,
    mut keys: KeyTranslator,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            let event = match event::read() {
                Ok(event) => event,
                Err(err) => {
                    log::error!("Terminal input failed: {err}");
                    let _ = sender.send(EngineEvent::Shutdown);
                    return;
                }
            };

            for input_event in keys.translate(event, &input, Instant::now()) {
                let quit = input_event == InputEvent::Quit;
                if let Some(engine_event) = input.translate(input_event) {
                    if sender.send(engine_event).is_err() {
                        return;
                    }
                }
                if quit {
                    return;
                }
            }
        }
    })
}

/// Maps terminal events onto pad input.
///
/// Pasted text is taken as a file path dropped onto the most recently pressed pad. Without
/// release reporting every press is followed by an immediate release, and a press of the same
/// key within `repeat_window` of the previous one is treated as auto-repeat.
pub struct KeyTranslator {
    reports_releases: bool,
    repeat_window: Duration,
    last_pad: Option<String>,
    last_press: Option<(String, Instant)>,
}

impl KeyTranslator {
    pub fn new(reports_releases: bool, repeat_window: Duration) -> Self {
        Self {
            reports_releases,
            repeat_window,
            last_pad: None,
            last_press: None,
        }
    }

    fn translate(&mut self, event: Event, input: &PadInput, now: Instant) -> Vec<InputEvent> {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Esc,
                kind: KeyEventKind::Press,
                ..
            }) => vec![InputEvent::Quit],
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => vec![InputEvent::Quit],
            Event::Key(KeyEvent {
                code: KeyCode::Char(c),
                kind,
                ..
            }) => {
                let key = c.to_string();
                match kind {
                    KeyEventKind::Press if self.reports_releases => {
                        self.remember_pad(input, &key);
                        vec![InputEvent::KeyDown { key, repeat: false }]
                    }
                    KeyEventKind::Press => {
                        self.remember_pad(input, &key);
                        let repeat = self.is_held(&key, now);
                        self.last_press = Some((key.clone(), now));
                        vec![
                            InputEvent::KeyDown {
                                key: key.clone(),
                                repeat,
                            },
                            InputEvent::KeyUp { key },
                        ]
                    }
                    KeyEventKind::Repeat => vec![InputEvent::KeyDown { key, repeat: true }],
                    KeyEventKind::Release => vec![InputEvent::KeyUp { key }],
                }
            }
            Event::Paste(text) => match (self.last_pad.clone(), pasted_path(&text)) {
                (Some(key), Some(path)) => vec![InputEvent::FileDropped { key, path }],
                (None, Some(_)) => {
                    log::info!("Press a pad before dropping a file onto it");
                    Vec::new()
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn remember_pad(&mut self, input: &PadInput, key: &str) {
        if let Some(pad) = input.pad_for(key) {
            self.last_pad = Some(pad);
        }
    }

    fn is_held(&self, key: &str, now: Instant) -> bool {
        matches!(
            &self.last_press,
            Some((last, at)) if last == key && now.saturating_duration_since(*at) < self.repeat_window
        )
    }
}

/// Extracts a file path from text pasted or dropped into the terminal.
///
/// Terminals quote paths, escape spaces with backslashes or paste `file://` URLs.
fn pasted_path(text: &str) -> Option<PathBuf> {
    let text = text.trim();
    let text = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| text.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
        .unwrap_or(text);
    let text = text.strip_prefix("file://").unwrap_or(text);
    let path = text.replace("\\ ", " ");

    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Draws frames as half-block characters, two canvas rows per terminal row.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn draw(&mut self, frame: &Frame<'_>, cols: u16, rows: u16) -> io::Result<()> {
        let chart_rows = rows.saturating_sub(2);
        let cells = downsample(frame.canvas, usize::from(cols), usize::from(chart_rows) * 2);

        queue!(self.out, MoveTo(0, 0))?;
        for (row, pair) in cells.chunks(2).enumerate() {
            queue!(self.out, MoveTo(0, row as u16))?;
            let bottom = pair.get(1).map(Vec::as_slice).unwrap_or(&[]);
            for (x, top) in pair[0].iter().enumerate() {
                let bottom = bottom.get(x).copied().unwrap_or(Rgb::BLACK);
                queue!(
                    self.out,
                    SetForegroundColor(color(*top)),
                    SetBackgroundColor(color(bottom)),
                    Print('▀')
                )?;
            }
        }
        queue!(self.out, ResetColor, MoveTo(0, chart_rows), Clear(ClearType::CurrentLine))?;

        for key in frame.pads {
            if frame.indicators.is_active(key) {
                queue!(
                    self.out,
                    SetBackgroundColor(color(Rgb(37, 150, 190))),
                    SetForegroundColor(Color::Black),
                    Print(format!(" {key} ")),
                    ResetColor,
                    Print(' ')
                )?;
            } else {
                queue!(self.out, Print(format!("[{key}] ")))?;
            }
        }

        queue!(
            self.out,
            MoveTo(0, chart_rows + 1),
            Clear(ClearType::CurrentLine),
            Print("Esc: quit | paste a file path to replace the last pad")
        )?;
        self.out.flush()
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn present(&mut self, frame: &Frame<'_>) {
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        if let Err(err) = self.draw(frame, cols, rows) {
            log::warn!("Failed to draw frame: {err}");
        }
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.0,
        g: rgb.1,
        b: rgb.2,
    }
}

/// Scales the canvas to `width` x `height` cells.
///
/// A cell takes the first lit pixel of its horizontal span so narrow bars survive scaling down.
fn downsample(canvas: &Canvas, width: usize, height: usize) -> Vec<Vec<Rgb>> {
    if canvas.width() == 0 || canvas.height() == 0 {
        return vec![vec![Rgb::BLACK; width]; height];
    }

    (0..height)
        .map(|row| {
            let y = row * canvas.height() / height;
            (0..width)
                .map(|col| {
                    let x0 = col * canvas.width() / width;
                    let x1 = ((col + 1) * canvas.width() / width).max(x0 + 1);
                    (x0..x1)
                        .filter_map(|x| canvas.pixel(x, y))
                        .find(|&p| p != Rgb::BLACK)
                        .unwrap_or(Rgb::BLACK)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use drumpad::catalog::{SoundCatalog, SoundEntry};

    use super::*;

    fn pads() -> PadInput {
        PadInput::new(&SoundCatalog {
            sound_files: vec![SoundEntry {
                key: "Q".to_string(),
                file: "kick.wav".to_string(),
            }],
        })
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind))
    }

    #[test]
    fn test_pasted_path_variants() {
        assert_eq!(pasted_path("/tmp/a.wav\n"), Some(PathBuf::from("/tmp/a.wav")));
        assert_eq!(
            pasted_path("'/tmp/my clap.wav'"),
            Some(PathBuf::from("/tmp/my clap.wav"))
        );
        assert_eq!(
            pasted_path("/tmp/my\\ clap.wav"),
            Some(PathBuf::from("/tmp/my clap.wav"))
        );
        assert_eq!(
            pasted_path("file:///tmp/a.wav"),
            Some(PathBuf::from("/tmp/a.wav"))
        );
        assert_eq!(pasted_path("   "), None);
    }

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn test_press_without_release_reporting() {
        let mut keys = KeyTranslator::new(false, WINDOW);
        let events = keys.translate(
            key(KeyCode::Char('q'), KeyEventKind::Press),
            &pads(),
            Instant::now(),
        );

        assert_eq!(
            events,
            vec![
                InputEvent::KeyDown {
                    key: "q".to_string(),
                    repeat: false
                },
                InputEvent::KeyUp {
                    key: "q".to_string()
                },
            ]
        );
        assert_eq!(keys.last_pad.as_deref(), Some("Q"));
    }

    #[test]
    fn test_held_key_triggers_once_without_release_reporting() {
        let input = pads();
        let mut keys = KeyTranslator::new(false, WINDOW);
        let start = Instant::now();

        // Terminal auto-repeat: an initial delay, then a steady stream of presses.
        let offsets = [0, 400, 430, 460, 490];
        let triggers = offsets
            .iter()
            .flat_map(|ms| {
                keys.translate(
                    key(KeyCode::Char('q'), KeyEventKind::Press),
                    &input,
                    start + Duration::from_millis(*ms),
                )
            })
            .filter_map(|event| input.translate(event))
            .filter(|event| matches!(event, EngineEvent::UserTriggered { .. }))
            .count();

        assert_eq!(triggers, 1);
    }

    #[test]
    fn test_repress_after_window_triggers_again() {
        let input = pads();
        let mut keys = KeyTranslator::new(false, WINDOW);
        let start = Instant::now();
        let press = || key(KeyCode::Char('q'), KeyEventKind::Press);

        let first = keys.translate(press(), &input, start);
        let second = keys.translate(press(), &input, start + WINDOW);

        assert!(matches!(first[0], InputEvent::KeyDown { repeat: false, .. }));
        assert!(matches!(second[0], InputEvent::KeyDown { repeat: false, .. }));
    }

    #[test]
    fn test_other_key_is_not_a_repeat() {
        let input = PadInput::new(&SoundCatalog {
            sound_files: vec![
                SoundEntry {
                    key: "Q".to_string(),
                    file: "kick.wav".to_string(),
                },
                SoundEntry {
                    key: "W".to_string(),
                    file: "snare.wav".to_string(),
                },
            ],
        });
        let mut keys = KeyTranslator::new(false, WINDOW);
        let now = Instant::now();

        keys.translate(key(KeyCode::Char('q'), KeyEventKind::Press), &input, now);
        let events = keys.translate(
            key(KeyCode::Char('w'), KeyEventKind::Press),
            &input,
            now + Duration::from_millis(20),
        );

        assert!(matches!(events[0], InputEvent::KeyDown { repeat: false, .. }));
        assert_eq!(keys.last_pad.as_deref(), Some("W"));
    }

    #[test]
    fn test_repeat_and_release() {
        let input = pads();
        let mut keys = KeyTranslator::new(true, WINDOW);
        let now = Instant::now();

        let repeat = keys.translate(key(KeyCode::Char('q'), KeyEventKind::Repeat), &input, now);
        assert_eq!(
            repeat,
            vec![InputEvent::KeyDown {
                key: "q".to_string(),
                repeat: true
            }]
        );

        let release = keys.translate(key(KeyCode::Char('q'), KeyEventKind::Release), &input, now);
        assert_eq!(
            release,
            vec![InputEvent::KeyUp {
                key: "q".to_string()
            }]
        );
    }

    #[test]
    fn test_presses_with_release_reporting_are_never_repeats() {
        let input = pads();
        let mut keys = KeyTranslator::new(true, WINDOW);
        let now = Instant::now();

        keys.translate(key(KeyCode::Char('q'), KeyEventKind::Press), &input, now);
        let again = keys.translate(
            key(KeyCode::Char('q'), KeyEventKind::Press),
            &input,
            now + Duration::from_millis(10),
        );

        assert_eq!(
            again,
            vec![InputEvent::KeyDown {
                key: "q".to_string(),
                repeat: false
            }]
        );
    }

    #[test]
    fn test_paste_targets_last_pad() {
        let input = pads();
        let mut keys = KeyTranslator::new(true, WINDOW);
        let now = Instant::now();

        let ignored = keys.translate(Event::Paste("/tmp/a.wav".into()), &input, now);
        assert!(ignored.is_empty());

        keys.translate(key(KeyCode::Char('q'), KeyEventKind::Press), &input, now);
        let dropped = keys.translate(Event::Paste("/tmp/a.wav".into()), &input, now);
        assert_eq!(
            dropped,
            vec![InputEvent::FileDropped {
                key: "Q".to_string(),
                path: PathBuf::from("/tmp/a.wav"),
            }]
        );
    }

    #[test]
    fn test_quit_keys() {
        let input = pads();
        let mut keys = KeyTranslator::new(true, WINDOW);
        let now = Instant::now();
        assert_eq!(
            keys.translate(key(KeyCode::Esc, KeyEventKind::Press), &input, now),
            vec![InputEvent::Quit]
        );

        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(keys.translate(ctrl_c, &input, now), vec![InputEvent::Quit]);
    }

    #[test]
    fn test_downsample_keeps_narrow_bars() {
        let mut canvas = Canvas::new(14, 4);
        canvas.fill_rect(7, 0, 1, 4, Rgb(1, 2, 3));

        let cells = downsample(&canvas, 2, 2);

        assert_eq!(cells[0], vec![Rgb::BLACK, Rgb(1, 2, 3)]);
        assert_eq!(cells[1], vec![Rgb::BLACK, Rgb(1, 2, 3)]);
    }

    #[test]
    fn test_present_writes_pads() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(0, 2, 4, 2, Rgb(37, 150, 190));
        let indicators = drumpad::input::PadIndicators::new(Duration::from_millis(100));
        let pads = vec!["Q".to_string(), "W".to_string()];

        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter
            .draw(
                &Frame {
                    canvas: &canvas,
                    pads: &pads,
                    indicators: &indicators,
                },
                4,
                4,
            )
            .unwrap();

        let text = String::from_utf8_lossy(&presenter.out);
        assert!(text.contains("[Q] [W]"));
        assert!(text.contains('▀'));
    }
}
