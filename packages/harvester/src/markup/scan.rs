//! Balanced-tag scanning.

use regex::Regex;

use crate::error::{HarvesterError, Result};

/// An element isolated from a larger text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch<'a> {
    /// From the start of the opening match through the end of the closing match.
    pub content: &'a str,

    /// Everything after the closing match.
    pub after: &'a str,
}

/// Find the first element opened by `begin` and return it with its balanced close.
///
/// Depth starts at 1 at the `begin` match. Every `boundary` match after it that
/// equals `open_literal` opens a nested element of the same kind; any other
/// `boundary` match closes one. Returns `None` when `begin` does not match or
/// the text ends before depth returns to 0.
///
/// # Arguments
/// * `text` - Whitespace-normalised markup
/// * `begin` - Pattern of the element's opening tag
/// * `boundary` - Pattern matching either an opening or a closing tag of the same kind
/// * `open_literal` - The exact `boundary` match text that denotes an opening tag
///
/// # Examples
/// ```
/// use regex::Regex;
/// use gradesync_harvester::markup::find_balanced;
///
/// let begin = Regex::new("<b>").unwrap();
/// let boundary = Regex::new("<b>|</b>").unwrap();
/// let found = find_balanced("x <b>1 <b>2</b></b> y", &begin, &boundary, "<b>").unwrap();
/// assert_eq!(found.content, "<b>1 <b>2</b></b>");
/// assert_eq!(found.after, " y");
/// ```
pub fn find_balanced<'a>(
    text: &'a str,
    begin: &Regex,
    boundary: &Regex,
    open_literal: &str,
) -> Option<TagMatch<'a>> {
    let opening = begin.find(text)?;
    let search_from = opening.end();
    let mut depth = 1usize;

    for tag in boundary.find_iter(&text[search_from..]) {
        if tag.as_str() == open_literal {
            depth += 1;
        } else {
            depth -= 1;
        }

        if depth == 0 {
            let end = search_from + tag.end();
            return Some(TagMatch {
                content: &text[opening.start()..end],
                after: &text[end..],
            });
        }
    }

    None
}

/// Split a run of sibling elements.
///
/// Repeatedly applies [`find_balanced`] to the remaining text while `more`
/// still matches it. If `more` promises another element but none can be
/// isolated, the page is inconsistent and no partial result is returned.
pub fn extract_elements<'a>(
    text: &'a str,
    begin: &Regex,
    boundary: &Regex,
    open_literal: &str,
    more: &Regex,
) -> Result<Vec<&'a str>> {
    let mut elements = Vec::new();
    let mut rest = text;

    while more.is_match(rest) {
        let found = find_balanced(rest, begin, boundary, open_literal).ok_or_else(|| {
            HarvesterError::malformed(
                format!("expected another element matching `{more}` but none could be isolated"),
                rest,
            )
        })?;
        elements.push(found.content);
        rest = found.after;
    }

    Ok(elements)
}
