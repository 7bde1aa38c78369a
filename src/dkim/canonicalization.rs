//! Relaxed canonicalization of message bodies and headers
//!
//! https://datatracker.ietf.org/doc/html/rfc6376#section-3.4

/// Canonicalize a message body using the relaxed algorithm.
///
/// Line endings are normalized first, so CR, LF and CRLF input all produce
/// the same canonical bytes. An empty or whitespace-only body canonicalizes
/// to a single CRLF.
pub(crate) fn relaxed_body(body: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::new();

    let mut i = 0;
    while i < body.len() {
        match body[i] {
            b'\r' => {
                if body.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                lines.push(std::mem::take(&mut current));
            }
            b'\n' => lines.push(std::mem::take(&mut current)),
            b => current.push(b),
        }
        i += 1;
    }
    if !current.is_empty() {
        lines.push(current);
    }

    for line in &mut lines {
        // Reduce all sequences of WSP within a line to a single SP, then
        // drop whitespace at the end of the line.
        let mut collapsed = Vec::with_capacity(line.len());
        let mut in_wsp = false;
        for &b in line.iter() {
            if b == b' ' || b == b'\t' {
                if !in_wsp {
                    collapsed.push(b' ');
                    in_wsp = true;
                }
            } else {
                collapsed.push(b);
                in_wsp = false;
            }
        }
        while collapsed.last() == Some(&b' ') {
            collapsed.pop();
        }
        *line = collapsed;
    }

    // Ignore all empty lines at the end of the message body
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    if lines.is_empty() {
        return b"\r\n".to_vec();
    }

    let mut out = Vec::with_capacity(body.len());
    for line in lines {
        out.extend_from_slice(&line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Canonicalize the requested headers out of a raw header block.
///
/// `requested` is a colon-separated, case-insensitive list of field names.
/// For every requested name the first occurrence from the top of the block
/// is selected (later duplicates are ignored); names with no matching
/// header are dropped. Returns the canonical header block and the kept
/// names joined with `:`, both in requested order.
pub(crate) fn relaxed_headers(raw_headers: &str, requested: &str) -> (String, String) {
    // Unfold continuation lines first: a line starting with WSP belongs to
    // the previous header.
    let mut logical: Vec<String> = Vec::new();
    for line in raw_headers.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match logical.last_mut() {
            Some(prev) if line.starts_with(' ') || line.starts_with('\t') => {
                prev.push(' ');
                prev.push_str(line);
            }
            _ => logical.push(line.to_string()),
        }
    }

    // Topmost occurrence wins
    let mut selected: Vec<(String, String)> = Vec::new();
    for line in &logical {
        let (name, value) = relaxed_header_line(line);
        if !selected.iter().any(|(n, _)| *n == name) {
            selected.push((name, value));
        }
    }

    let mut block = String::new();
    let mut kept: Vec<String> = Vec::new();
    for name in requested.split(':') {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || kept.contains(&name) {
            continue;
        }
        if let Some((_, value)) = selected.iter().find(|(n, _)| *n == name) {
            block.push_str(&name);
            block.push(':');
            block.push_str(value);
            block.push_str("\r\n");
            kept.push(name);
        }
    }

    (block, kept.join(":"))
}

/// Canonicalize a single logical header line.
///
/// The name is everything before the first colon, lowercased and trimmed;
/// the value has all whitespace runs collapsed to single spaces and is
/// trimmed.
pub(crate) fn relaxed_header_line(line: &str) -> (String, String) {
    let (name, value) = line.split_once(':').unwrap_or((line, ""));
    (
        name.trim().to_ascii_lowercase(),
        collapse_whitespace(value),
    )
}

fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_wsp = false;
    for c in value.chars() {
        if c == ' ' || c == '\t' || c == '\r' || c == '\n' {
            if !in_wsp {
                out.push(' ');
                in_wsp = true;
            }
        } else {
            out.push(c);
            in_wsp = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn body_collapses_whitespace_and_trailing_lines() {
        assert_eq!(
            relaxed_body(b"Hello  world  \r\n\r\n\r\n"),
            b"Hello world\r\n"
        );
    }

    #[test]
    fn body_is_idempotent() {
        for body in [
            &b"Hello  world  \r\n\r\n\r\n"[..],
            b"no terminator",
            b"tabs\tand  spaces \t \r\nsecond line\r\n",
            b"",
        ] {
            let once = relaxed_body(body);
            assert_eq!(relaxed_body(&once), once);
        }
    }

    #[test]
    fn body_line_ending_styles_are_equivalent() {
        let crlf = relaxed_body(b"one\r\ntwo\r\n");
        assert_eq!(relaxed_body(b"one\ntwo\n"), crlf);
        assert_eq!(relaxed_body(b"one\rtwo\r"), crlf);
        assert_eq!(relaxed_body(b"one\ntwo\r\n\r\n"), crlf);
    }

    #[test]
    fn empty_and_blank_bodies_canonicalize_to_crlf() {
        assert_eq!(relaxed_body(b""), b"\r\n");
        assert_eq!(relaxed_body(b"   \t "), b"\r\n");
        assert_eq!(relaxed_body(b"\r\n\r\n\r\n"), b"\r\n");
    }

    #[test]
    fn body_without_final_newline_gains_one() {
        assert_eq!(relaxed_body(b"hey        "), b"hey\r\n");
        assert_eq!(relaxed_body(b"hey"), b"hey\r\n");
    }

    #[test]
    fn headers_unfold_and_collapse() {
        let (block, kept) = relaxed_headers(
            "From: a@x\r\nSubject: Hi\r\n there\r\n",
            "from:subject",
        );
        assert_eq!(block, "from:a@x\r\nsubject:Hi there\r\n");
        assert_eq!(kept, "from:subject");
    }

    #[test]
    fn headers_keep_requested_order() {
        let (block, kept) = relaxed_headers(
            "Subject: Hi\r\nTo: b@y\r\nFrom: a@x\r\n",
            "from:to:subject",
        );
        assert_eq!(block, "from:a@x\r\nto:b@y\r\nsubject:Hi\r\n");
        assert_eq!(kept, "from:to:subject");
    }

    #[test]
    fn headers_first_occurrence_wins() {
        let (block, kept) = relaxed_headers(
            "Subject: first\r\nSubject: second\r\n",
            "subject",
        );
        assert_eq!(block, "subject:first\r\n");
        assert_eq!(kept, "subject");
    }

    #[test]
    fn headers_missing_names_are_dropped() {
        let (block, kept) = relaxed_headers("From: a@x\r\n", "from:reply-to:cc");
        assert_eq!(block, "from:a@x\r\n");
        assert_eq!(kept, "from");
    }

    #[test]
    fn headers_empty_value_is_kept() {
        let (block, kept) = relaxed_headers("X-Empty:\r\nFrom: a@x\r\n", "x-empty:from");
        assert_eq!(block, "x-empty:\r\nfrom:a@x\r\n");
        assert_eq!(kept, "x-empty:from");
    }

    #[test]
    fn header_line_splits_on_first_colon() {
        assert_eq!(
            relaxed_header_line("SUBJect:  AbC: def  "),
            ("subject".to_string(), "AbC: def".to_string())
        );
        assert_eq!(
            relaxed_header_line("Subject \t:\t Kimi \t  No \t Na Wa"),
            ("subject".to_string(), "Kimi No Na Wa".to_string())
        );
    }
}
