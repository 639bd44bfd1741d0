//! Integration tests for word wrapping, alignment and justification.

use pdf_pagesmith::geometry::Rect;
use pdf_pagesmith::writer::text_layout::{alignment_offset, justify_spacing, render};
use pdf_pagesmith::writer::{
    wrap, Alignment, Color, ContentStreamOp, Font, FontFamily, FontStyle, StateCache, TextStyle, Unit,
};
use pdf_pagesmith::Error;
use proptest::prelude::*;

/// 6pt advance per character.
fn courier() -> Font {
    Font::new(FontFamily::Courier, 10.0)
}

fn texts(lines: &[pdf_pagesmith::writer::Line]) -> Vec<&str> {
    lines.iter().map(|l| l.text.as_str()).collect()
}

mod wrap_tests {
    use super::*;

    #[test]
    fn test_breaks_at_last_blank() {
        let result = wrap("aaa bbb ccc", 45.0, f64::INFINITY, &courier(), 0.0).unwrap();
        assert_eq!(texts(&result.lines), ["aaa bbb", "ccc"]);
        assert_eq!(result.lines[0].width, 42.0);
        assert_eq!(result.lines[0].word_count, 2);
        assert!(!result.lines[0].paragraph_end);
        assert!(result.lines[1].paragraph_end);
        assert!(result.remainder.is_none());
    }

    #[test]
    fn test_long_word_breaks_mid_word() {
        let result = wrap("abcdefghij", 30.0, f64::INFINITY, &courier(), 0.0).unwrap();
        assert_eq!(texts(&result.lines), ["abcde", "fghij"]);
    }

    #[test]
    fn test_newline_forces_break() {
        let result = wrap("one\ntwo", 500.0, f64::INFINITY, &courier(), 0.0).unwrap();
        assert_eq!(texts(&result.lines), ["one", "two"]);
        assert!(result.lines[0].paragraph_end);
    }

    #[test]
    fn test_height_limit_returns_remainder() {
        let font = courier();
        let height = 2.0 * font.line_height();
        let result = wrap("a b c d", 6.0, height, &font, 0.0).unwrap();
        assert_eq!(texts(&result.lines), ["a", "b"]);
        assert_eq!(result.remainder.as_deref(), Some("c d"));
        assert_eq!(result.height(&font), height);
    }

    #[test]
    fn test_zero_height_keeps_everything_as_remainder() {
        let result = wrap("hello", 100.0, 0.0, &courier(), 0.0).unwrap();
        assert!(result.lines.is_empty());
        assert_eq!(result.remainder.as_deref(), Some("hello"));
    }

    #[test]
    fn test_first_line_offset_shortens_first_line() {
        let result = wrap("aaa bbb", 45.0, f64::INFINITY, &courier(), 30.0).unwrap();
        assert_eq!(texts(&result.lines), ["aa", "a bbb"]);
        assert_eq!(result.lines[0].available, 15.0);
        assert_eq!(result.lines[1].available, 45.0);
    }

    #[test]
    fn test_no_room_after_offset_starts_fresh_line() {
        let result = wrap("aaa bbb", 45.0, f64::INFINITY, &courier(), 42.0).unwrap();
        assert_eq!(texts(&result.lines), ["", "aaa bbb"]);
    }

    #[test]
    fn test_glyph_wider_than_region_is_error() {
        let err = wrap("a", 5.0, f64::INFINITY, &courier(), 0.0).unwrap_err();
        match err {
            Error::TextRegionTooSmall { ch, needed, available } => {
                assert_eq!(ch, 'a');
                assert_eq!(needed, 6.0);
                assert_eq!(available, 5.0);
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        let result = wrap("", 100.0, f64::INFINITY, &courier(), 0.0).unwrap();
        assert!(result.lines.is_empty());
        assert!(result.remainder.is_none());
    }

    #[test]
    fn test_trailing_blanks_are_not_measured() {
        let result = wrap("ab   ", 100.0, f64::INFINITY, &courier(), 0.0).unwrap();
        assert_eq!(texts(&result.lines), ["ab"]);
        assert_eq!(result.lines[0].width, 12.0);
    }
}

mod alignment_tests {
    use super::*;

    fn line(text: &str, available: f64, paragraph_end: bool) -> pdf_pagesmith::writer::Line {
        let font = courier();
        pdf_pagesmith::writer::Line {
            text: text.to_string(),
            width: font.text_width(text),
            available,
            word_count: text.split_whitespace().count(),
            paragraph_end,
        }
    }

    #[test]
    fn test_alignment_offsets() {
        assert_eq!(alignment_offset(Alignment::Left, 45.0, 42.0), 0.0);
        assert_eq!(alignment_offset(Alignment::Justify, 45.0, 42.0), 0.0);
        assert_eq!(alignment_offset(Alignment::Right, 45.0, 42.0), 3.0);
        assert_eq!(alignment_offset(Alignment::Center, 45.0, 42.0), 1.5);
    }

    #[test]
    fn test_justify_spreads_slack_over_gaps() {
        assert_eq!(justify_spacing(&line("aa bb cc", 60.0, false), false), 6.0);
    }

    #[test]
    fn test_justify_skips_paragraph_end_unless_asked() {
        let last = line("aa bb", 60.0, true);
        assert_eq!(justify_spacing(&last, false), 0.0);
        assert_eq!(justify_spacing(&last, true), 30.0);
    }

    #[test]
    fn test_justify_single_word_is_zero() {
        assert_eq!(justify_spacing(&line("word", 60.0, false), true), 0.0);
    }

    #[test]
    fn test_render_justified_sets_word_spacing() {
        let font = courier();
        let result = wrap("aaa bbb ccc", 45.0, f64::INFINITY, &font, 0.0).unwrap();
        let style = TextStyle::new(font).with_alignment(Alignment::Justify);
        let mut cache = StateCache::new();
        let ops = render(&result.lines, "F1", &style, Rect::new(0.0, 0.0, 45.0, 100.0), 0.0, &mut cache);

        assert!(ops.contains(&ContentStreamOp::SetWordSpacing(3.0)));
        assert!(ops.contains(&ContentStreamOp::ShowText(b"aaa bbb".to_vec())));
        assert!(ops.contains(&ContentStreamOp::ShowText(b"ccc".to_vec())));
        assert_eq!(ops.iter().filter(|op| **op == ContentStreamOp::BeginText).count(), 1);
    }

    #[test]
    fn test_render_right_aligned_positions_lines() {
        let font = courier();
        let result = wrap("ab", 60.0, f64::INFINITY, &font, 0.0).unwrap();
        let style = TextStyle::new(font).with_alignment(Alignment::Right);
        let mut cache = StateCache::new();
        let ops = render(&result.lines, "F1", &style, Rect::new(10.0, 0.0, 60.0, 100.0), 0.0, &mut cache);
        let baseline = 100.0 - font.ascent();
        assert!(ops.contains(&ContentStreamOp::SetTextMatrix(1.0, 0.0, 0.0, 1.0, 58.0, baseline)));
    }

    #[test]
    fn test_render_underline_and_strikeout_stroke_once() {
        let font = courier().with_style(FontStyle::UNDERLINE | FontStyle::STRIKEOUT);
        let result = wrap("abc", 60.0, f64::INFINITY, &font, 0.0).unwrap();
        let style = TextStyle::new(font).with_color(Color::rgb(1.0, 0.0, 0.0));
        let mut cache = StateCache::new();
        let ops = render(&result.lines, "F1", &style, Rect::new(0.0, 0.0, 60.0, 20.0), 0.0, &mut cache);
        let moves = ops.iter().filter(|op| matches!(op, ContentStreamOp::MoveTo(..))).count();
        assert_eq!(moves, 2);
        assert_eq!(ops.last(), Some(&ContentStreamOp::Stroke));
    }

    #[test]
    fn test_render_rotated_wraps_in_save_restore() {
        let font = courier();
        let result = wrap("abc", 60.0, f64::INFINITY, &font, 0.0).unwrap();
        let style = TextStyle::new(font).with_angle(90.0);
        let mut cache = StateCache::new();
        let ops = render(&result.lines, "F1", &style, Rect::new(0.0, 0.0, 60.0, 20.0), 0.0, &mut cache);
        assert_eq!(ops.first(), Some(&ContentStreamOp::SaveState));
        assert_eq!(ops.last(), Some(&ContentStreamOp::RestoreState));
    }
}

fn words() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z]{1,12}", 1..40).prop_map(|w| w.join(" "))
}

proptest! {
    #[test]
    fn prop_wrapped_lines_fit_width(text in words(), width in 30.0f64..400.0) {
        let font = Font::new(FontFamily::Helvetica, 12.0);
        let result = wrap(&text, width, f64::INFINITY, &font, 0.0).unwrap();
        for line in &result.lines {
            prop_assert!(line.width <= width + 1e-6, "{:?} is wider than {}", line.text, width);
        }
        // Wrapping only drops the blanks it breaks at
        let rejoined: String = texts(&result.lines).concat();
        let original: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let rejoined: String = rejoined.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert_eq!(rejoined, original);
    }

    #[test]
    fn prop_height_limit_is_respected(text in words(), lines in 1usize..6) {
        let font = Font::new(FontFamily::Times, 11.0);
        let height = lines as f64 * font.line_height();
        let result = wrap(&text, 80.0, height, &font, 0.0).unwrap();
        prop_assert!(result.lines.len() <= lines);
        if result.remainder.is_some() {
            prop_assert_eq!(result.lines.len(), lines);
        }
    }

    #[test]
    fn prop_unit_round_trip(value in -10_000.0f64..10_000.0) {
        for unit in [
            Unit::Point,
            Unit::Inch,
            Unit::Centimeter,
            Unit::Millimeter,
            Unit::Pica,
            Unit::Twip,
            Unit::Pixel,
        ] {
            let back = unit.to_external(unit.to_internal(value));
            prop_assert!((back - value).abs() < 1e-9 * value.abs().max(1.0));
        }
    }
}
