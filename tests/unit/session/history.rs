use super::*;

#[test]
fn undo_redo_walks_the_line() {
    let mut h = History::new(10);
    let mut state = 0;
    for next in 1..=3 {
        h.record(state);
        state = next;
    }
    assert_eq!(h.undo_count(), 3);

    state = h.undo(state).unwrap();
    assert_eq!(state, 2);
    state = h.undo(state).unwrap();
    assert_eq!(state, 1);
    assert_eq!(h.redo_count(), 2);

    state = h.redo(state).unwrap();
    assert_eq!(state, 2);
    assert!(h.can_redo());
}

#[test]
fn recording_clears_redo() {
    let mut h = History::new(10);
    h.record("a");
    let cur = h.undo("b").unwrap();
    assert_eq!(cur, "a");
    h.record(cur);
    assert!(!h.can_redo());
    assert_eq!(h.redo("c"), None);
}

#[test]
fn depth_bounds_undo_stack() {
    let mut h = History::new(2);
    for i in 0..5 {
        h.record(i);
    }
    assert_eq!(h.undo_count(), 2);
    assert_eq!(h.undo(5), Some(4));
    assert_eq!(h.undo(4), Some(3));
    assert_eq!(h.undo(3), None);
}

#[test]
fn zero_depth_disables_history() {
    let mut h = History::new(0);
    h.record(1);
    assert!(!h.can_undo());
    h.clear();
    assert_eq!(h.undo_count() + h.redo_count(), 0);
}
