use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use test_log::test;

use crate::{
    Cursor, LineOptions, Spinner, SpinnerError, SpinnerOptions, SpinnerState, Theme, Viewport,
};

/// In-memory terminal understanding the escape sequences the cursor emits.
pub struct VirtualTerm {
    pub rows: Vec<Vec<char>>,
    pub row: usize,
    pub col: usize,
    pub cursor_visible: bool,
    /// Wrap width; text past it continues on the next row like a real
    /// terminal would.
    pub columns: Option<usize>,
    buf: Vec<u8>,
}

impl VirtualTerm {
    pub fn new(columns: Option<usize>) -> Self {
        Self {
            rows: vec![Vec::new()],
            row: 0,
            col: 0,
            cursor_visible: true,
            columns,
            buf: Vec::new(),
        }
    }

    /// Screen contents without trailing blank rows.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.rows.iter().map(|r| r.iter().collect()).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    fn ensure_row(&mut self, row: usize) {
        while self.rows.len() <= row {
            self.rows.push(Vec::new());
        }
    }

    fn put(&mut self, c: char) {
        if self.columns.is_some_and(|columns| self.col >= columns) {
            self.row += 1;
            self.col = 0;
        }
        self.ensure_row(self.row);
        let line = &mut self.rows[self.row];
        while line.len() < self.col {
            line.push(' ');
        }
        if self.col < line.len() {
            line[self.col] = c;
        } else {
            line.push(c);
        }
        self.col += 1;
    }

    fn process(&mut self, s: &str) {
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "unsupported escape");
                    let mut params = String::new();
                    let mut action = ' ';
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            action = c;
                            break;
                        }
                        params.push(c);
                    }
                    let n = params.parse::<usize>().unwrap_or(1);
                    match (action, params.as_str()) {
                        ('A', _) => self.row = self.row.saturating_sub(n),
                        ('B', _) => {
                            self.row += n;
                            self.ensure_row(self.row);
                        }
                        ('K', _) => {
                            self.ensure_row(self.row);
                            self.rows[self.row].clear();
                        }
                        ('l', "?25") => self.cursor_visible = false,
                        ('h', "?25") => self.cursor_visible = true,
                        // Colors and styles do not change the layout.
                        ('m', _) => {}
                        other => panic!("unsupported sequence {other:?}"),
                    }
                }
                '\r' => self.col = 0,
                '\n' => {
                    self.row += 1;
                    self.col = 0;
                    self.ensure_row(self.row);
                }
                c => self.put(c),
            }
        }
    }
}

#[derive(Clone)]
struct SharedTerm(Arc<Mutex<VirtualTerm>>);

impl SharedTerm {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(VirtualTerm::new(None))))
    }

    fn wrapping(columns: usize) -> Self {
        Self(Arc::new(Mutex::new(VirtualTerm::new(Some(columns)))))
    }

    fn render(&self) -> String {
        self.0.lock().unwrap().render()
    }

    fn row(&self, row: usize) -> String {
        self.render().lines().nth(row).unwrap_or_default().to_string()
    }

    fn cursor_visible(&self) -> bool {
        self.0.lock().unwrap().cursor_visible
    }
}

impl Write for SharedTerm {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut term = self.0.lock().unwrap();
        if !term.buf.is_empty() {
            let s = String::from_utf8(std::mem::take(&mut term.buf)).unwrap();
            term.process(&s);
        }
        Ok(())
    }
}

fn options() -> SpinnerOptions {
    SpinnerOptions::default()
        .theme(Theme::plain())
        .line(LineOptions::default().show_datetime(false))
        .spin_interval(Duration::from_millis(5))
}

fn setup_with(options: SpinnerOptions, rows: Option<usize>) -> (Spinner, SharedTerm) {
    let term = SharedTerm::new();
    let cursor = Cursor::new(term.clone(), Viewport::Fixed { columns: 80, rows });
    let spinner = Spinner::with_cursor(cursor, options).unwrap();
    (spinner, term)
}

fn setup() -> (Spinner, SharedTerm) {
    setup_with(options(), None)
}

fn setup_narrow(columns: usize) -> (Spinner, SharedTerm) {
    let term = SharedTerm::wrapping(columns);
    let cursor = Cursor::new(term.clone(), Viewport::Fixed { columns, rows: None });
    let spinner = Spinner::with_cursor(cursor, options()).unwrap();
    (spinner, term)
}

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error("boom")]
    Boom,
    #[error(transparent)]
    Spinner(#[from] SpinnerError),
}

#[test]
fn test_virtual_term_overwrites_in_place() {
    let mut term = SharedTerm::new();
    write!(term, "one\ntwo\n\x1b[2A\r\x1b[2Kuno\r\x1b[2B").unwrap();
    term.flush().unwrap();
    assert_eq!(term.render(), "uno\ntwo");
    assert_eq!(term.0.lock().unwrap().row, 2);
}

#[test]
fn test_group_with_lines() {
    let (spinner, term) = setup();
    spinner
        .group("Loading", |group| {
            group.write("step 1")?;
            group.write("step 2")
        })
        .unwrap();
    assert_eq!(term.render(), "✔ Loading\n  > step 1\n  > step 2");
}

#[test]
fn test_warning_survives_finalize() {
    let (spinner, term) = setup();
    let mut node = None;
    spinner
        .group("Loading", |group| {
            node = Some(group.clone());
            group.write("step 1")?;
            group.warning(Some("careful"))
        })
        .unwrap();

    let node = node.unwrap();
    assert_eq!(node.state(), SpinnerState::Warning);
    assert!(node.is_done());
    assert_eq!(term.render(), "✘ Loading\n  > step 1\n  ✘ careful");
}

#[test]
fn test_state_is_the_maximum_written() {
    let (spinner, _term) = setup();
    let mut node = None;
    spinner
        .group("Steps", |group| {
            node = Some(group.clone());
            group.write_state("a", SpinnerState::Warning)?;
            group.write_state("b", SpinnerState::Fail)?;
            group.write_state("c", SpinnerState::Ok)?;
            group.warning(None)
        })
        .unwrap();
    assert_eq!(node.unwrap().state(), SpinnerState::Fail);
}

#[test]
fn test_escalate_without_text_prints_nothing() {
    let (spinner, term) = setup();
    spinner
        .group("Quiet", |group| {
            group.warning(None)?;
            group.fail(Some(""))?;
            assert_eq!(group.line_count(), 0);
            assert_eq!(group.state(), SpinnerState::Fail);
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert_eq!(term.render(), "✘ Quiet");
}

#[test]
fn test_done_is_idempotent() {
    let (spinner, term) = setup();
    spinner
        .group("Once", |group| {
            group.write("line")?;
            group.done(Some("Renamed"))?;
            let after_first = term.render();
            group.done(Some("Ignored"))?;
            assert_eq!(term.render(), after_first);
            assert!(matches!(
                group.write("late"),
                Err(SpinnerError::Finalized { .. })
            ));
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert_eq!(term.render(), "✔ Renamed\n  > line");
}

#[test]
fn test_row_accounting() {
    let (spinner, _term) = setup();
    spinner
        .group("Top", |top| {
            for i in 0..3 {
                top.write(&format!("line {i}"))?;
            }
            assert_eq!(top.line_count(), 3);

            top.child("Sub", |sub| {
                sub.write("a")?;
                sub.write("b")?;
                assert_eq!(sub.line_count(), 2);
                Ok::<_, SpinnerError>(())
            })?;
            // Two lines plus the child's own header row.
            assert_eq!(top.line_count(), 3 + 2 + 1);
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
}

#[test]
fn test_error_in_child_fails_and_propagates() {
    let (spinner, term) = setup();
    let mut sub_node = None;
    let result: Result<(), TestError> = spinner.group("Top", |top| {
        top.write("a")?;
        top.child("Sub", |sub| {
            sub_node = Some(sub.clone());
            sub.write("x")?;
            Err(TestError::Boom)
        })
    });

    assert!(matches!(result, Err(TestError::Boom)));
    assert_eq!(sub_node.unwrap().state(), SpinnerState::Fail);
    assert_eq!(
        term.render(),
        "✘ Top\n  > a\n  ✘ Sub\n    > x\n    ✘ boom\n  ✘ boom"
    );
}

#[test]
fn test_child_failure_bubbles_to_parent() {
    let (spinner, term) = setup();
    let mut top_node = None;
    spinner
        .group("Top", |top| {
            top_node = Some(top.clone());
            let result = top.child("Sub", |_| Err::<(), _>(TestError::Boom));
            assert!(result.is_err());
            // Visible before the parent finishes.
            assert_eq!(top.state(), SpinnerState::Fail);
            top.write("after")?;
            Ok::<_, TestError>(())
        })
        .unwrap();

    assert_eq!(top_node.unwrap().state(), SpinnerState::Fail);
    assert_eq!(term.render(), "✘ Top\n  ✘ Sub\n    ✘ boom\n  > after");
}

#[test]
fn test_ok_child_does_not_bubble() {
    let (spinner, _term) = setup();
    spinner
        .group("Top", |top| {
            top.child("Sub", |sub| sub.write("fine"))?;
            assert_eq!(top.state(), SpinnerState::NotSet);
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
}

#[test]
fn test_panic_is_recorded_and_resumed() {
    let (spinner, term) = setup();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        spinner.group("Risky", |group| -> Result<(), SpinnerError> {
            group.write("trying")?;
            panic!("kaboom");
        })
    }));

    assert!(result.is_err());
    let group = &spinner.groups()[0];
    assert!(group.is_done());
    assert_eq!(group.state(), SpinnerState::Fail);
    assert_eq!(term.render(), "✘ Risky\n  > trying\n  ✘ kaboom");
}

#[test]
fn test_reenter_resumes_at_last_leaf() {
    let (spinner, term) = setup();
    spinner
        .group("First Group", |first| {
            first.write("Message 1")?;
            first.child("Second Group", |second| second.write("Message 3"))
        })
        .unwrap();

    let mut third = None;
    spinner
        .reenter("Third Group", |group| {
            third = Some(group.clone());
            group.write("Message 5")
        })
        .unwrap();

    let third = third.unwrap();
    assert_eq!(third.depth(), 1);
    assert_eq!(third.index(), 1);
    assert_eq!(
        term.render(),
        "✔ First Group\n  > Message 1\n  ✔ Second Group\n    > Message 3\n  ✔ Third Group\n    > Message 5"
    );
}

#[test]
fn test_reenter_failure_updates_finished_ancestors() {
    let (spinner, term) = setup();
    spinner
        .group("First", |first| first.child("Second", |second| second.write("ok")))
        .unwrap();

    let result: Result<(), TestError> = spinner.reenter("Third", |_| Err(TestError::Boom));
    assert!(result.is_err());
    assert_eq!(spinner.groups()[0].state(), SpinnerState::Fail);
    assert_eq!(term.row(0), "✘ First");
    assert_eq!(term.row(2), "    > ok");
}

#[test]
fn test_node_reenter_without_children_opens_child() {
    let (spinner, term) = setup();
    spinner
        .group("Top", |top| top.reenter("Inner", |inner| inner.write("hi")))
        .unwrap();
    assert_eq!(term.render(), "✔ Top\n  ✔ Inner\n    > hi");
}

#[test]
fn test_child_of_finished_node_is_rejected() {
    let (spinner, _term) = setup();
    spinner
        .group("Top", |top| {
            top.done(None)?;
            let result = top.child("Late", |_| Ok::<_, SpinnerError>(()));
            assert!(matches!(result, Err(SpinnerError::Finalized { .. })));
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
}

#[test]
fn test_header_animates_while_running() {
    let (spinner, term) = setup();
    let frames = spinner.options().frames.frames();
    spinner
        .group("Spinning", |_| {
            std::thread::sleep(Duration::from_millis(60));
            let header = term.row(0);
            let glyph = header.split(' ').next().unwrap();
            assert!(frames.iter().any(|f| *f == glyph), "unexpected header {header:?}");
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert_eq!(term.render(), "✔ Spinning");
}

#[test]
fn test_concurrent_writes_to_one_node() {
    let (spinner, term) = setup();
    spinner
        .group("Work", |group| {
            std::thread::scope(|s| {
                for worker in 0..4 {
                    let group = group.clone();
                    s.spawn(move || {
                        for i in 0..5 {
                            group.write(&format!("worker {worker} step {i}")).unwrap();
                        }
                    });
                }
            });
            assert_eq!(group.line_count(), 20);
            Ok::<_, SpinnerError>(())
        })
        .unwrap();

    let screen = term.render();
    let lines: Vec<&str> = screen.lines().collect();
    assert_eq!(lines.len(), 21);
    assert_eq!(lines[0], "✔ Work");
    assert!(lines[1..].iter().all(|l| l.starts_with("  > worker ")));
}

#[test]
fn test_concurrent_children_keep_headers_in_place() {
    let (spinner, term) = setup();
    spinner
        .group("Jobs", |group| {
            std::thread::scope(|s| {
                for job in 0..4 {
                    let group = group.clone();
                    s.spawn(move || {
                        group
                            .child(&format!("job {job}"), |child| {
                                for i in 0..3 {
                                    child.write(&format!("job {job} line {i}"))?;
                                    std::thread::sleep(Duration::from_millis(3));
                                }
                                Ok::<_, SpinnerError>(())
                            })
                            .unwrap();
                    });
                }
            });
            assert_eq!(group.line_count(), 4 * (1 + 3));
            Ok::<_, SpinnerError>(())
        })
        .unwrap();

    let screen = term.render();
    let lines: Vec<&str> = screen.lines().collect();
    assert_eq!(lines.len(), 1 + 4 * 4);
    assert_eq!(lines[0], "✔ Jobs");
    for job in 0..4 {
        assert!(lines.contains(&format!("  ✔ job {job}").as_str()), "{screen}");
    }
    let headers = lines.iter().filter(|l| l.starts_with("  ✔ job ")).count();
    let body = lines.iter().filter(|l| l.starts_with("    > job ")).count();
    assert_eq!((headers, body), (4, 12));
}

#[test]
fn test_cursor_hidden_until_spinner_dropped() {
    let (spinner, term) = setup();
    assert!(term.cursor_visible());
    spinner
        .group("Hide", |_| {
            assert!(!term.cursor_visible());
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert!(!term.cursor_visible());
    drop(spinner);
    assert!(term.cursor_visible());
}

#[test]
fn test_separated_groups() {
    let (spinner, term) = setup_with(options().separate(true), None);
    spinner.group("One", |g| g.write("a")).unwrap();
    spinner.group("Two", |g| g.write("b")).unwrap();
    assert_eq!(term.render(), "\n✔ One\n  > a\n\n✔ Two\n  > b");
}

#[test]
fn test_custom_line_options_are_validated() {
    let (spinner, term) = setup();
    spinner
        .group("Opts", |group| {
            let bad = LineOptions::default().bullet(Some("->"));
            assert!(matches!(
                group.write_with("x", SpinnerState::NotSet, &bad),
                Err(SpinnerError::InvalidBullet(_))
            ));
            let labelled = LineOptions::default().show_datetime(false).label(true);
            group.write_with("slow", SpinnerState::Warning, &labelled)
        })
        .unwrap();
    assert_eq!(term.render(), "✘ Opts\n  ✘ Warning: slow");
}

#[test]
fn test_scrolled_out_header_is_not_repainted() {
    let (spinner, term) = setup_with(options(), Some(4));
    spinner
        .group("Tall", |group| {
            for i in 0..5 {
                group.write(&format!("{i}"))?;
            }
            Ok::<_, SpinnerError>(())
        })
        .unwrap();

    let header = term.row(0);
    assert!(!header.starts_with('✔'), "header repainted: {header:?}");
    assert!(header.ends_with(" Tall"));
    assert_eq!(term.row(5), "  > 4");
}

#[test]
fn test_invalid_options_rejected_up_front() {
    let term = SharedTerm::new();
    let cursor = Cursor::new(term, Viewport::Fixed { columns: 80, rows: None });
    let options = options().spin_interval(Duration::ZERO);
    assert!(matches!(
        Spinner::with_cursor(cursor, options),
        Err(SpinnerError::ZeroInterval)
    ));
}

#[test]
fn test_error_after_explicit_done_still_fails_node() {
    let (spinner, term) = setup();
    let mut sub_node = None;
    let result: Result<(), TestError> = spinner.group("Top", |top| {
        top.child("Sub", |sub| -> Result<(), TestError> {
            sub_node = Some(sub.clone());
            sub.done(Some("Sub renamed"))?;
            Err(TestError::Boom)
        })
    });

    assert!(matches!(result, Err(TestError::Boom)));
    assert_eq!(sub_node.unwrap().state(), SpinnerState::Fail);
    assert_eq!(spinner.groups()[0].state(), SpinnerState::Fail);
    assert_eq!(
        term.render(),
        "✘ Top\n  ✘ Sub renamed\n    ✘ boom\n  ✘ boom"
    );
}

#[test]
fn test_panic_after_explicit_done_still_fails_node() {
    let (spinner, term) = setup();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        spinner.group("Risky", |group| -> Result<(), SpinnerError> {
            group.done(None)?;
            panic!("late kaboom");
        })
    }));

    assert!(result.is_err());
    assert_eq!(spinner.groups()[0].state(), SpinnerState::Fail);
    assert_eq!(term.render(), "✘ Risky\n  ✘ late kaboom");
}

#[test]
fn test_error_alias_fails_node() {
    let (spinner, term) = setup();
    spinner
        .group("Alias", |group| {
            group.error(Some("bad input"))?;
            assert_eq!(group.state(), SpinnerState::Fail);
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert_eq!(term.render(), "✘ Alias\n  ✘ bad input");
}

#[test]
fn test_long_lines_do_not_shift_headers() {
    let (spinner, term) = setup_narrow(20);
    spinner
        .group("Narrow", |group| {
            group.write("a forty column long message that wraps")?;
            // Let the animation repaint the header a few times.
            std::thread::sleep(Duration::from_millis(40));
            group.write("next")
        })
        .unwrap();
    assert_eq!(term.render(), "✔ Narrow\n  > a forty column l\n  > next");
}

#[test]
fn test_long_header_is_cut_to_width() {
    let (spinner, term) = setup_narrow(10);
    spinner
        .group("A header far wider than ten", |group| group.write("x"))
        .unwrap();
    assert_eq!(term.render(), "✔ A header\n  > x");
}

#[test]
fn test_write_interval_throttles_lines() {
    let (spinner, _term) = setup_with(options().write_interval(Duration::from_millis(15)), None);
    let started = std::time::Instant::now();
    spinner
        .group("Slow", |group| {
            for i in 0..3 {
                group.write(&format!("{i}"))?;
            }
            Ok::<_, SpinnerError>(())
        })
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(45));
}

#[test]
fn test_base_indent_shifts_headers_and_lines() {
    let (spinner, term) = setup_with(options().base_indent(1), None);
    spinner
        .group("Top", |top| {
            top.write("a")?;
            top.child("Sub", |sub| sub.write("b"))
        })
        .unwrap();
    assert_eq!(term.render(), "  ✔ Top\n    > a\n    ✔ Sub\n      > b");
}

#[test]
fn test_reenter_prefers_deeper_leaf_over_newer_group() {
    let (spinner, term) = setup();
    spinner
        .group("A", |a| a.child("A1", |a1| a1.child("A2", |a2| a2.write("deep"))))
        .unwrap();
    spinner.group("B", |b| b.write("shallow")).unwrap();

    let mut reentered = None;
    spinner
        .reenter("R", |r| {
            reentered = Some(r.clone());
            Ok::<_, SpinnerError>(())
        })
        .unwrap();

    let reentered = reentered.unwrap();
    assert_eq!((reentered.depth(), reentered.index()), (2, 1));
    assert_eq!(spinner.groups()[0].children()[0].children().len(), 2);
    assert_eq!(spinner.groups()[1].children().len(), 0);
    assert!(term.render().ends_with("  > shallow\n    ✔ R"));
}

#[cfg(feature = "layer")]
#[test]
fn test_layer_does_not_keep_spinner_alive() {
    use tracing_subscriber::layer::SubscriberExt;

    let (spinner, term) = setup();
    let subscriber = tracing_subscriber::registry().with(spinner.layer());
    spinner.group("Task", |_| Ok::<_, SpinnerError>(())).unwrap();
    assert!(!term.cursor_visible());

    drop(spinner);
    assert!(term.cursor_visible());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "app", "after the spinner is gone");
    });
    assert_eq!(term.render(), "✔ Task");
}

#[cfg(feature = "layer")]
#[test]
fn test_layer_routes_events_into_running_node() {
    use tracing_subscriber::layer::SubscriberExt;

    let (spinner, term) = setup();
    let subscriber = tracing_subscriber::registry().with(spinner.layer());
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "app", "before");
        spinner
            .group("Task", |_| {
                tracing::info!(target: "app", files = 3, "synced");
                tracing::warn!(target: "app", "careful");
                // Diagnostics from this crate never reach the output.
                tracing::info!("internal");
                Ok::<_, SpinnerError>(())
            })
            .unwrap();
    });
    assert_eq!(
        term.render(),
        "before\n✘ Task\n  > synced files=3\n  ✘ careful"
    );
}
