//! Structural XML check used when a config enables `xml_document`.
//!
//! Services with a real schema engine plug it in through
//! `DocumentValidator`; the CLI only checks that tags nest properly under a
//! single root element.

use warden_core::providers::DocumentValidator;
use warden_core::{ValidationIssue, ValidationResult};

pub struct WellFormedXml;

impl DocumentValidator for WellFormedXml {
    fn validate_document(&self, document: &str) -> ValidationResult {
        match check_nesting(document) {
            Ok(()) => ValidationResult::valid(),
            Err((offset, message)) => ValidationResult::from_issues(vec![
                ValidationIssue::new("xml.syntax", message).at(location(document, offset)),
            ]),
        }
    }
}

/// `line:column` of a byte offset, both 1-based.
fn location(document: &str, offset: usize) -> String {
    let before = &document[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    format!("{}:{}", line, column)
}

fn tag_name(tag: &str) -> &str {
    tag.split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
}

/// Offset of the `>` closing an element tag, skipping quoted attribute values.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (None, '>') => return Some(i),
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            _ => {}
        }
    }
    None
}

fn check_nesting(document: &str) -> Result<(), (usize, String)> {
    let mut open: Vec<(&str, usize)> = Vec::new();
    let mut roots = 0;
    let mut rest = document;
    let mut offset = 0;

    while let Some(start) = rest.find('<') {
        let text = &rest[..start];
        if open.is_empty() && !text.trim().is_empty() {
            return Err((offset, "text outside the root element".to_string()));
        }

        let tag_start = offset + start;
        let after = &rest[start + 1..];
        let (terminator, skip) = if after.starts_with("!--") {
            ("-->", 3)
        } else if after.starts_with("![CDATA[") {
            ("]]>", 3)
        } else if after.starts_with('?') {
            ("?>", 2)
        } else {
            (">", 1)
        };
        let end = if terminator == ">" {
            tag_end(after)
        } else {
            after.find(terminator)
        }
        .ok_or((tag_start, "unterminated markup".to_string()))?;
        let tag = &after[..end];

        if !(tag.starts_with('!') || tag.starts_with('?')) {
            if let Some(name) = tag.strip_prefix('/') {
                let name = name.trim();
                match open.pop() {
                    Some((expected, _)) if expected == name => {}
                    Some((expected, _)) => {
                        return Err((
                            tag_start,
                            format!("closing tag </{}> does not match <{}>", name, expected),
                        ))
                    }
                    None => return Err((tag_start, format!("unexpected closing tag </{}>", name))),
                }
            } else {
                let name = tag_name(tag);
                if name.is_empty() {
                    return Err((tag_start, "element without a name".to_string()));
                }
                if open.is_empty() {
                    roots += 1;
                    if roots > 1 {
                        return Err((tag_start, "more than one root element".to_string()));
                    }
                }
                if !tag.ends_with('/') {
                    open.push((name, tag_start));
                }
            }
        }

        let consumed = start + 1 + end + skip;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if let Some((name, at)) = open.pop() {
        return Err((at, format!("element <{}> is never closed", name)));
    }
    if !rest.trim().is_empty() {
        return Err((offset, "text outside the root element".to_string()));
    }
    if roots == 0 {
        return Err((0, "document has no root element".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(document: &str) -> ValidationResult {
        WellFormedXml.validate_document(document)
    }

    #[test]
    fn test_well_formed() {
        let doc = "<?xml version=\"1.0\"?>\n<!-- orders -->\n<orders>\n  <order id=\"1\"/>\n  <note><![CDATA[a < b]]></note>\n</orders>\n";
        let result = check(doc);
        assert!(result.valid, "{:?}", result.errors);
    }

    #[test]
    fn test_quoted_angle_bracket_in_attribute() {
        assert!(check(r#"<a x="1>2"/>"#).valid);
        assert!(check("<a y='b>c'><b/></a>").valid);

        let result = check(r#"<a x="1>2">"#);
        assert!(!result.valid);
        assert!(result.errors[0].message.contains("never closed"));
    }

    #[test]
    fn test_mismatched_close() {
        let result = check("<a>\n<b></a>");
        assert!(!result.valid);
        assert_eq!(result.errors[0].location.as_deref(), Some("2:4"));
        assert!(result.errors[0].message.contains("</a>"));
    }

    #[test]
    fn test_unclosed_and_empty() {
        assert!(!check("<a><b/>").valid);
        assert!(!check("   ").valid);
        assert!(!check("<a/><b/>").valid);
        assert!(!check("hello <a/>").valid);
    }
}
