use std::time::{Duration, Instant};

use ieltsroom::buffer::{BufferedField, CommitTrigger, EditState};

const GRACE: Duration = Duration::from_secs(2);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_local_edit_survives_stale_upstream() {
    let t0 = Instant::now();
    let mut field = BufferedField::new(CommitTrigger::Blur, GRACE);
    assert!(field.sync("", t0));

    field.focus();
    for c in "abc".chars() {
        field.insert(c, t0);
    }
    assert!(!field.sync("server value", t0 + ms(100)));
    assert_eq!(field.value(), "abc");

    assert_eq!(field.blur(t0 + ms(200)), Some("abc".to_string()));
    // Echo of the previous server state inside the grace window.
    assert!(!field.sync("server value", t0 + ms(1000)));
    assert_eq!(field.value(), "abc");

    assert!(field.sync("from elsewhere", t0 + ms(2300)));
    assert_eq!(field.value(), "from elsewhere");
}

#[test]
fn test_first_sync_always_adopts() {
    let t0 = Instant::now();
    let mut field = BufferedField::new(CommitTrigger::Enter, GRACE);
    field.focus();
    assert!(field.sync("restored", t0));
    assert_eq!(field.value(), "restored");
    assert_eq!(field.cursor(), 8);
}

#[test]
fn test_enter_commits_single_line_only() {
    let t0 = Instant::now();
    let mut line = BufferedField::new(CommitTrigger::Enter, GRACE);
    line.sync("", t0);
    line.insert('x', t0);
    assert_eq!(line.enter(t0), Some("x".to_string()));
    assert!(matches!(line.state(), EditState::Settling { .. }));

    let mut essay = BufferedField::new(CommitTrigger::Debounce(ms(500)), GRACE);
    essay.sync("", t0);
    essay.insert('x', t0);
    assert_eq!(essay.enter(t0), None);
}

#[test]
fn test_debounce_commits_after_idle() {
    let t0 = Instant::now();
    let mut essay = BufferedField::new(CommitTrigger::Debounce(ms(500)), GRACE);
    essay.sync("", t0);
    essay.insert('a', t0);
    essay.insert('b', t0 + ms(300));
    assert_eq!(essay.poll(t0 + ms(600)), None);
    assert_eq!(essay.poll(t0 + ms(800)), Some("ab".to_string()));
    assert_eq!(essay.poll(t0 + ms(900)), None);
    assert!(essay.is_focused());
}

#[test]
fn test_unchanged_commit_is_silent() {
    let t0 = Instant::now();
    let mut field = BufferedField::new(CommitTrigger::Enter, GRACE);
    field.sync("same", t0);
    field.insert('!', t0);
    field.backspace(t0);
    assert_eq!(field.blur(t0), None);
    assert_eq!(field.state(), EditState::Clean);
    assert!(!field.is_guarded());
}

#[test]
fn test_editing_is_char_based() {
    let t0 = Instant::now();
    let mut field = BufferedField::new(CommitTrigger::Enter, GRACE);
    field.sync("café", t0);
    field.backspace(t0);
    assert_eq!(field.value(), "caf");
    field.move_home();
    field.insert('é', t0);
    field.delete(t0);
    assert_eq!(field.value(), "éaf");
    field.move_end();
    assert_eq!(field.cursor(), 3);
    field.set("new", t0);
    assert_eq!(field.value(), "new");
}
