use super::*;

#[test]
fn widths_scale_with_font_and_weight() {
    assert!((text_width("abcd", 10.0, false) - 22.4).abs() < 1e-4);
    assert!(text_width("abcd", 10.0, true) > text_width("abcd", 10.0, false));
    assert_eq!(text_width("", 10.0, false), 0.0);
    assert!((line_height(20.0) - 26.0).abs() < 1e-4);
}

#[test]
fn single_line_ignores_width() {
    let lines = wrap_lines("one two\nthree", 16.0, false, false, Some(10.0));
    assert_eq!(lines, vec!["one two three".to_owned()]);
}

#[test]
fn multiline_wraps_words_greedily() {
    // 5.6px per char at 10px: "aaa bbb" = 39.2px, "aaa bbb ccc" = 61.6px.
    let lines = wrap_lines("aaa bbb ccc", 10.0, false, true, Some(45.0));
    assert_eq!(lines, vec!["aaa bbb".to_owned(), "ccc".to_owned()]);
}

#[test]
fn multiline_keeps_explicit_breaks() {
    let lines = wrap_lines("a\n\nb", 10.0, false, true, None);
    assert_eq!(lines, vec!["a".to_owned(), String::new(), "b".to_owned()]);
}

#[test]
fn long_words_are_split() {
    // 20px fits three 5.6px chars.
    let lines = wrap_lines("abcdefg", 10.0, false, true, Some(20.0));
    assert_eq!(
        lines,
        vec!["abc".to_owned(), "def".to_owned(), "g".to_owned()]
    );
}

#[test]
fn block_measure_uses_widest_line() {
    let lines = vec!["ab".to_owned(), "abcd".to_owned()];
    let (w, h) = measure_block(&lines, 10.0, false);
    assert!((w - 22.4).abs() < 1e-4);
    assert!((h - 26.0).abs() < 1e-4);
}
