//! Comment stream XML parsing
//!
//! Comment documents look like:
//!
//! ```xml
//! <i>
//!   <chatid>10</chatid>
//!   <d p="5.2,1,25,16777215,1700000000,0,abcd,1">text</d>
//! </i>
//! ```
//!
//! Only `d` elements matter. The first comma-separated field of `p` is the
//! offset in seconds.

use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use thiserror::Error;

use crate::data::{CommentEntry, CommentTimeline};

/// Name of the comment element
const COMMENT_TAG: &[u8] = b"d";

/// Name of the comment parameter attribute
const PARAM_ATTR: &[u8] = b"p";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed comment XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
}

/// Comment being assembled between its start and end tags
struct PendingComment {
    time: f64,
    text: String,
}

/// Parse a comment document into a sorted timeline.
///
/// Comments with empty (trimmed) text are dropped. An unparsable time is
/// taken as 0. A syntax error anywhere fails the whole document.
pub fn parse_comments(xml: &str) -> Result<CommentTimeline, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut pending: Option<PendingComment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) if start.name().as_ref() == COMMENT_TAG => {
                pending = Some(PendingComment {
                    time: comment_time(&start),
                    text: String::new(),
                });
            }
            Ok(Event::Text(text)) => {
                if let Some(comment) = pending.as_mut() {
                    match text.unescape() {
                        Ok(unescaped) => comment.text.push_str(&unescaped),
                        // Unknown entities keep their raw spelling.
                        Err(_) => comment.text.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(comment) = pending.as_mut() {
                    comment.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(end)) if end.name().as_ref() == COMMENT_TAG => {
                if let Some(comment) = pending.take() {
                    let text = comment.text.trim();
                    if !text.is_empty() {
                        entries.push(CommentEntry::new(comment.time, text));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(source) => {
                return Err(ParseError::Xml {
                    position: reader.error_position(),
                    source,
                })
            }
        }
    }

    Ok(CommentTimeline::from_entries(entries))
}

fn comment_time(start: &BytesStart<'_>) -> f64 {
    let Ok(Some(param)) = start.try_get_attribute(PARAM_ATTR) else {
        return 0.0;
    };
    let param = String::from_utf8_lossy(&param.value);
    parse_time(&param)
}

/// Offset from the first field of a `p` attribute. Like a lenient number
/// parse, the longest numeric prefix counts and trailing junk is ignored.
fn parse_time(param: &str) -> f64 {
    let field = param.split(',').next().unwrap_or_default().trim_start();
    leading_number()
        .find(field)
        .and_then(|number| number.as_str().parse::<f64>().ok())
        .filter(|time| time.is_finite())
        .map_or(0.0, |time| time.max(0.0))
}

fn leading_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid number pattern")
    })
}
