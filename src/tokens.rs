//! Whitespace tokenizer and the cursor both parse stages share.

use std::str::FromStr;

use crate::error::END_OF_INPUT;

/// Split raw .bvh text on runs of whitespace.
///
/// BVH has no quoting, escaping or comments, so this cannot fail; an empty
/// document yields no tokens and is rejected later by the parser.
pub fn tokenize(content: &str) -> Vec<&str> {
    content.split_whitespace().collect()
}

/// Classification of a single token, computed once and then matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Hierarchy,
    Root,
    Joint,
    End,
    Site,
    OpenBrace,
    CloseBrace,
    Offset,
    Channels,
    Motion,
    Frames,
    Frame,
    Time,
    /// Names, numbers and channel tags.
    Other,
}

impl Keyword {
    pub fn classify(token: &str) -> Keyword {
        match token {
            "HIERARCHY" => Keyword::Hierarchy,
            "ROOT" => Keyword::Root,
            "JOINT" => Keyword::Joint,
            "End" => Keyword::End,
            "Site" => Keyword::Site,
            "{" => Keyword::OpenBrace,
            "}" => Keyword::CloseBrace,
            "OFFSET" => Keyword::Offset,
            "CHANNELS" => Keyword::Channels,
            "MOTION" => Keyword::Motion,
            "Frames:" => Keyword::Frames,
            "Frame" => Keyword::Frame,
            "Time:" => Keyword::Time,
            _ => Keyword::Other,
        }
    }

    /// Literal text of the keyword, used in error messages. `Other` has none.
    pub fn literal(self) -> &'static str {
        match self {
            Keyword::Hierarchy => "HIERARCHY",
            Keyword::Root => "ROOT",
            Keyword::Joint => "JOINT",
            Keyword::End => "End",
            Keyword::Site => "Site",
            Keyword::OpenBrace => "{",
            Keyword::CloseBrace => "}",
            Keyword::Offset => "OFFSET",
            Keyword::Channels => "CHANNELS",
            Keyword::Motion => "MOTION",
            Keyword::Frames => "Frames:",
            Keyword::Frame => "Frame",
            Keyword::Time => "Time:",
            Keyword::Other => "",
        }
    }
}

/// A position in the token sequence that only ever moves forward.
#[derive(Debug)]
pub struct TokenCursor<'t, 'a> {
    tokens: &'t [&'a str],
    position: usize,
}

impl<'t, 'a> TokenCursor<'t, 'a> {
    pub fn new(tokens: &'t [&'a str], position: usize) -> Self {
        Self { tokens, position }
    }

    /// Index of the next unconsumed token.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).copied()
    }

    pub fn peek_keyword(&self) -> Option<Keyword> {
        self.peek().map(Keyword::classify)
    }

    /// Consume the next token, returning it with its index.
    pub fn next_token(&mut self) -> Option<(usize, &'a str)> {
        let token = self.peek()?;
        let position = self.position;
        self.position += 1;
        Some((position, token))
    }

    /// Consume the next token and parse it as a number.
    ///
    /// `Ok(None)` means the stream ran out; `Err` carries the offending token
    /// and its index.
    pub fn next_number<T: FromStr>(&mut self) -> Result<Option<T>, (usize, &'a str)> {
        match self.next_token() {
            None => Ok(None),
            Some((position, token)) => token
                .parse::<T>()
                .map(Some)
                .map_err(|_| (position, token)),
        }
    }
}

/// Render an optional token for error messages.
pub(crate) fn found(token: Option<&str>) -> String {
    token.unwrap_or(END_OF_INPUT).to_string()
}
