//! Header folding
//!
//! https://tools.ietf.org/html/rfc5322#section-2.2.3

/// Default maximum number of visible octets per folded line.
pub(crate) const LINE_WIDTH: usize = 76;

/// Folds `input` so that no line exceeds `limit` visible octets, breaking
/// at whitespace boundaries with `CRLF SP`.
///
/// Existing CRLF sequences are kept as line breaks and do not count toward
/// the next line. A single word longer than the window is emitted intact:
/// folding never splits inside a word.
pub(crate) fn fold(input: &str, limit: usize) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    for (i, line) in input.split("\r\n").enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        fold_line(line, limit, &mut out);
    }
    out
}

fn fold_line(line: &str, limit: usize, out: &mut String) {
    let mut column = 0;
    for (i, word) in line.split(' ').enumerate() {
        // the separating space belongs to the current line
        let needed = if i == 0 { word.len() } else { word.len() + 1 };
        if i > 0 && column + needed > limit {
            out.push_str("\r\n ");
            column = 1;
        } else if i > 0 {
            out.push(' ');
            column += 1;
        }
        out.push_str(word);
        column += word.len();
    }
}
