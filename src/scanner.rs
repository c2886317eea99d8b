//! Sentence scanner.
//!
//! Finds the next unit of source that can be submitted on its own: either a
//! bullet or a sentence ending in a terminating dot. Comments (which nest)
//! and string literals are skipped; dots inside qualified names are not
//! terminators.
//!
//! The scanner only reads document text. It walks the document line by
//! line with an explicit cursor, so a comment spanning the whole file costs
//! no stack.
//!
//! Columns are byte offsets into the line, as returned by
//! [`DocumentView::line`].

use crate::document::{DocumentView, Position, Range};

/// Single-character proof-structuring tokens. Each one is a chunk.
pub const BULLETS: [char; 5] = ['{', '}', '-', '+', '*'];

const COMMENT_OPEN: &str = "(*";
const COMMENT_CLOSE: &str = "*)";

/// Find the next chunk starting at or after `from`.
///
/// The returned range starts at the first character that is neither blank
/// nor part of a leading comment, and stops on the terminating dot (or on
/// the bullet itself). Returns `None` when the document ends first,
/// including inside an unterminated comment or string.
///
/// # Example
///
/// ```
/// use libcoqtop::document::{Position, TextDocument};
/// use libcoqtop::scanner::next_chunk;
///
/// let doc = TextDocument::new("(* intro *) Require Import A.B.C. ");
/// let chunk = next_chunk(&doc, Position::new(0, 0)).unwrap();
/// assert_eq!(chunk.start, Position::new(0, 12));
/// assert_eq!(chunk.stop, Position::new(0, 32));
/// ```
pub fn next_chunk<D: DocumentView + ?Sized>(doc: &D, from: Position) -> Option<Range> {
    let mut pos = from;
    loop {
        pos = skip_blank(doc, pos)?;
        let rest = tail(doc.line(pos.line)?, pos.column);

        if rest.starts_with(COMMENT_OPEN) {
            pos = skip_comment(doc, advance(pos, COMMENT_OPEN.len()))?;
            continue;
        }
        if rest.starts_with(&BULLETS[..]) {
            return Some(Range::new(pos, pos));
        }
        let stop = find_terminator(doc, pos)?;
        return Some(Range::new(pos, stop));
    }
}

/// Map a character offset into submitted `text` to a document position.
///
/// `origin` is where `text` starts in the document. Only positions on the
/// first line of `text` are shifted by the origin's column. Offsets past
/// the end of `text` are clamped to it.
pub fn position_from_offset(origin: Position, text: &str, offset: usize) -> Position {
    let byte_offset = text
        .char_indices()
        .nth(offset)
        .map_or(text.len(), |(idx, _)| idx);
    let prefix = &text[..byte_offset];

    let line = prefix.matches('\n').count();
    let last = prefix.rsplit('\n').next().unwrap_or_default();
    let column = if line == 0 {
        origin.column + last.len()
    } else {
        last.len()
    };
    Position::new(origin.line + line, column)
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Dot,
    Comment,
    Quote,
}

/// Position of the next terminating dot at or after `pos`.
fn find_terminator<D: DocumentView + ?Sized>(doc: &D, mut pos: Position) -> Option<Position> {
    loop {
        let line = doc.line(pos.line)?;
        let rest = tail(line, pos.column);

        let next = [
            rest.find('.').map(|idx| (idx, Token::Dot)),
            rest.find(COMMENT_OPEN).map(|idx| (idx, Token::Comment)),
            rest.find('"').map(|idx| (idx, Token::Quote)),
        ]
        .into_iter()
        .flatten()
        .min_by_key(|(idx, _)| *idx);

        pos = match next {
            None => next_line(pos),
            Some((idx, Token::Comment)) => {
                skip_comment(doc, advance(pos, idx + COMMENT_OPEN.len()))?
            }
            Some((idx, Token::Quote)) => skip_string(doc, advance(pos, idx + 1))?,
            Some((idx, Token::Dot)) => {
                let at = pos.column + idx;
                if is_terminator(line, at) {
                    return Some(Position::new(pos.line, at));
                }
                Position::new(pos.line, at + 1)
            }
        };
    }
}

/// Check whether the dot at byte `at` ends a sentence.
///
/// It must be followed by whitespace or the end of the line. A dot right
/// after another dot only counts as the last of an ellipsis (`...`).
fn is_terminator(line: &str, at: usize) -> bool {
    let bytes = line.as_bytes();
    if bytes.get(at + 1).is_some_and(|b| !b.is_ascii_whitespace()) {
        return false;
    }
    let dot_before = |back: usize| at >= back && bytes[at - back] == b'.';
    if dot_before(1) {
        return dot_before(2);
    }
    true
}

/// Position right after the comment closing the one opened before `pos`.
fn skip_comment<D: DocumentView + ?Sized>(doc: &D, mut pos: Position) -> Option<Position> {
    let mut depth = 1usize;
    loop {
        let rest = tail(doc.line(pos.line)?, pos.column);
        let open = rest.find(COMMENT_OPEN);
        let close = rest.find(COMMENT_CLOSE);

        match (open, close) {
            (open, Some(close)) if open.map_or(true, |open| close < open) => {
                depth -= 1;
                pos = advance(pos, close + COMMENT_CLOSE.len());
                if depth == 0 {
                    return Some(pos);
                }
            }
            (Some(open), _) => {
                depth += 1;
                pos = advance(pos, open + COMMENT_OPEN.len());
            }
            _ => pos = next_line(pos),
        }
    }
}

/// Position right after the quote closing the string opened before `pos`.
fn skip_string<D: DocumentView + ?Sized>(doc: &D, mut pos: Position) -> Option<Position> {
    loop {
        let rest = tail(doc.line(pos.line)?, pos.column);
        match rest.find('"') {
            Some(idx) => return Some(advance(pos, idx + 1)),
            None => pos = next_line(pos),
        }
    }
}

/// First non-whitespace position at or after `pos`.
fn skip_blank<D: DocumentView + ?Sized>(doc: &D, mut pos: Position) -> Option<Position> {
    loop {
        let rest = tail(doc.line(pos.line)?, pos.column);
        match rest.find(|c: char| !c.is_whitespace()) {
            Some(idx) => return Some(advance(pos, idx)),
            None => pos = next_line(pos),
        }
    }
}

fn tail(line: &str, column: usize) -> &str {
    line.get(column..).unwrap_or_default()
}

fn advance(pos: Position, bytes: usize) -> Position {
    Position::new(pos.line, pos.column + bytes)
}

fn next_line(pos: Position) -> Position {
    Position::new(pos.line + 1, 0)
}
