//! Page text normalisation.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse every run of whitespace to a single space.
///
/// All parsers expect their input to have gone through this first.
///
/// # Examples
/// ```
/// use gradesync_harvester::markup::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("<tr>\n\t<td>  x</td>\r\n</tr>"), "<tr> <td> x</td> </tr>");
/// ```
pub fn normalize_whitespace(page: &str) -> Cow<'_, str> {
    WHITESPACE_RUN.replace_all(page, " ")
}
