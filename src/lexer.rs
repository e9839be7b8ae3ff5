//! Lexical analysis of a command line.
//!
//! The line is cut at spaces and tabs only. Every resulting word is then classified as a
//! pipe, a background marker, a redirection or a plain word. Quotes do not group words;
//! a word fully wrapped in matching quotes merely loses them.

use crate::command::RedirectSlot;

/// Characters separating words.
pub const SPLITTERS: [char; 2] = [' ', '\t'];

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain word: command name or argument, with wrapping quotes removed.
    Word(String),
    /// The pipe operator, `|`.
    PipeOp,
    /// The background marker, `&`.
    Background,
    /// A redirection operator together with whatever followed it in the same word.
    /// `>out.txt` carries `"out.txt"`, a bare `>` carries an empty path.
    Redirect(RedirectSlot, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    state: LexingState,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str) -> Self {
        LexingFSM {
            input: line.chars(),
            state: LexingState::Start,
            buffer: String::new(),
        }
    }

    fn make_tokens(mut self) -> Vec<Token> {
        let mut out = Vec::new();

        while let Some(ch) = self.input.next() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
            }
        }

        if self.state == LexingState::ReadingWord {
            self.finish_word(&mut out);
        }
        out
    }

    fn handle_start(&mut self, ch: char) {
        if !SPLITTERS.contains(&ch) {
            self.buffer.push(ch);
            self.state = LexingState::ReadingWord;
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        if SPLITTERS.contains(&ch) {
            self.finish_word(out);
            self.state = LexingState::Start;
        } else {
            self.buffer.push(ch);
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        let word = std::mem::take(&mut self.buffer);
        out.push(classify(&word));
    }
}

fn classify(word: &str) -> Token {
    if word == "|" {
        Token::PipeOp
    } else if word == "&" {
        Token::Background
    } else if let Some(path) = word.strip_prefix(">>") {
        Token::Redirect(RedirectSlot::Append, path.to_string())
    } else if let Some(path) = word.strip_prefix('>') {
        Token::Redirect(RedirectSlot::Truncate, path.to_string())
    } else if let Some(path) = word.strip_prefix('<') {
        Token::Redirect(RedirectSlot::Input, path.to_string())
    } else {
        Token::Word(strip_quotes(word).to_string())
    }
}

/// Remove one pair of matching `"` or `'` wrapping the whole word.
///
/// Words of two characters or less are left alone, so `""` stays as it is.
pub fn strip_quotes(word: &str) -> &str {
    if word.len() <= 2 {
        return word;
    }
    for quote in ['"', '\''] {
        if let Some(inner) = word
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    word
}

/// Split a line into classified tokens. Never fails: any input yields some token list.
pub fn split_into_tokens(line: &str) -> Vec<Token> {
    LexingFSM::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_whitespace_collapses() {
        let tokens = split_into_tokens("  ls \t -la   /tmp ");
        assert_eq!(tokens, vec![word("ls"), word("-la"), word("/tmp")]);
    }

    #[test]
    fn test_operators_are_classified() {
        let tokens = split_into_tokens("cat <in | sort >out >>log &");
        assert_eq!(
            tokens,
            vec![
                word("cat"),
                Token::Redirect(RedirectSlot::Input, "in".to_string()),
                Token::PipeOp,
                word("sort"),
                Token::Redirect(RedirectSlot::Truncate, "out".to_string()),
                Token::Redirect(RedirectSlot::Append, "log".to_string()),
                Token::Background,
            ]
        );
    }

    #[test]
    fn test_glued_pipe_is_a_word() {
        assert_eq!(split_into_tokens("a|b"), vec![word("a|b")]);
    }

    #[test]
    fn test_bare_redirect_has_empty_path() {
        assert_eq!(
            split_into_tokens(">> x"),
            vec![Token::Redirect(RedirectSlot::Append, String::new()), word("x")]
        );
    }

    #[test]
    fn test_quotes_are_stripped_only_when_symmetric() {
        assert_eq!(strip_quotes("\"foo\""), "foo");
        assert_eq!(strip_quotes("'bar'"), "bar");
        assert_eq!(strip_quotes("\"baz'"), "\"baz'");
        assert_eq!(strip_quotes("\"\""), "\"\"");
        assert_eq!(strip_quotes("\"unterminated"), "\"unterminated");
    }

    #[test]
    fn test_quotes_do_not_group_words() {
        let tokens = split_into_tokens("echo \"hello world\"");
        assert_eq!(tokens, vec![word("echo"), word("\"hello"), word("world\"")]);
    }

    #[test]
    fn test_blank_input_has_no_tokens() {
        assert!(split_into_tokens("").is_empty());
        assert!(split_into_tokens(" \t  ").is_empty());
    }
}
