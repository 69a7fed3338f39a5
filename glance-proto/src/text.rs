//! Icon-marker text encoding
//!
//! Caller strings may embed `[icon:N]` markers. Plain characters encode as
//! their 7-bit code; a well-formed marker encodes as the single raw byte `N`.
//! Malformed or unterminated markers fall through to literal encoding - the
//! encoder never fails. The mapping is lossy and one-way.

const MARKER_PREFIX: &str = "[icon:";

pub fn text_with_icons(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(MARKER_PREFIX) {
        push_literal(&mut out, &rest[..start]);
        let after = &rest[start + MARKER_PREFIX.len()..];

        if let Some((code, tail)) = parse_icon_code(after) {
            out.push(code);
            rest = tail;
        } else {
            // Not a valid marker: emit the prefix literally and rescan from
            // just past it, so a later well-formed marker still matches.
            push_literal(&mut out, MARKER_PREFIX);
            rest = after;
        }
    }
    push_literal(&mut out, rest);
    out
}

fn parse_icon_code(after: &str) -> Option<(u8, &str)> {
    let end = after.find(']')?;
    let digits = &after[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = digits.parse::<u16>().ok().filter(|c| *c <= 255)?;
    Some((code as u8, &after[end + 1..]))
}

fn push_literal(out: &mut Vec<u8>, s: &str) {
    for c in s.chars() {
        out.push((c as u32 & 0x7f) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii() {
        assert_eq!(text_with_icons("Hi!"), vec![0x48, 0x69, 0x21]);
    }

    #[test]
    fn icon_marker_becomes_raw_byte() {
        assert_eq!(text_with_icons("Hi[icon:7]!"), vec![0x48, 0x69, 0x07, 0x21]);
    }

    #[test]
    fn temp_with_icon() {
        assert_eq!(
            text_with_icons("Temp [icon:3]C"),
            vec![0x54, 0x65, 0x6d, 0x70, 0x20, 0x03, 0x43]
        );
    }

    #[test]
    fn unterminated_marker_stays_literal() {
        assert_eq!(
            text_with_icons("[icon:12"),
            b"[icon:12".iter().map(|b| b & 0x7f).collect::<Vec<u8>>()
        );
    }

    #[test]
    fn non_numeric_marker_stays_literal() {
        assert_eq!(
            text_with_icons("[icon:ab]"),
            b"[icon:ab]".iter().map(|b| b & 0x7f).collect::<Vec<u8>>()
        );
    }

    #[test]
    fn out_of_range_code_stays_literal() {
        let out = text_with_icons("[icon:999]");
        assert_eq!(out, b"[icon:999]".to_vec());
    }

    #[test]
    fn marker_after_broken_marker_still_matches() {
        let out = text_with_icons("[icon:12[icon:5]");
        let mut expect: Vec<u8> = b"[icon:12".to_vec();
        expect.push(5);
        assert_eq!(out, expect);
    }

    #[test]
    fn non_ascii_masked_to_seven_bits() {
        // U+00B0 DEGREE SIGN, codepoint 0xB0, masks to 0x30.
        assert_eq!(text_with_icons("\u{b0}"), vec![0x30]);
    }
}
