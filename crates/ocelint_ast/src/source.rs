//! Source-segment resolution.
//!
//! Used only for report annotations: given the original source text
//! and a node span, recover the first line of the text the node
//! covers. Unresolvable spans (synthetic nodes, positions past the end
//! of the buffer) yield `None` rather than an error; annotation is
//! best effort.

use crate::Span;

/// Returns the first line of the source segment covered by `span`,
/// starting at the span's column, with trailing whitespace removed.
pub fn first_annotation_line(source: &str, span: Span) -> Option<String> {
    if span.start_line == 0 {
        return None;
    }
    let line = source.lines().nth(span.start_line as usize - 1)?;
    let column = span.column as usize;
    // Synthetic spans can point anywhere, including into the middle
    // of a multibyte character.
    if column > line.len() || !line.is_char_boundary(column) {
        return None;
    }
    let segment = line[column..].trim_end();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_from_span_column() {
        let source = "def f():\n    return [\n        1,\n    ]\n";
        let span = Span::new(2, 4, 4);
        assert_eq!(
            first_annotation_line(source, span).as_deref(),
            Some("return [")
        );
    }

    #[test]
    fn synthetic_span_is_not_an_error() {
        assert_eq!(first_annotation_line("x = 1\n", Span::line(0, 0)), None);
        assert_eq!(first_annotation_line("x = 1\n", Span::line(9, 0)), None);
        assert_eq!(first_annotation_line("x = 1\n", Span::line(1, 40)), None);
    }

    #[test]
    fn column_inside_a_multibyte_character_is_not_an_error() {
        // Byte 7 lands inside the two-byte `é`.
        let source = "x = 'résumé'\n";
        assert_eq!(first_annotation_line(source, Span::line(1, 7)), None);
        assert_eq!(
            first_annotation_line(source, Span::line(1, 4)).as_deref(),
            Some("'résumé'")
        );
    }
}
