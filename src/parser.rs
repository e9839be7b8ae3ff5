use crate::command::{Command, RedirectSlot};
use crate::lexer::{self, SPLITTERS, Token};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A pipe with no command on one of its sides, e.g. `ls |` or `| wc`.
    EmptyStage,
    /// A redirection with no command to apply it to, e.g. `> out.txt`.
    MissingCommand(RedirectSlot),
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::EmptyStage => f.write_str("syntax error near unexpected token `|'"),
            ParsingError::MissingCommand(slot) => {
                write!(f, "syntax error near unexpected token `{}'", slot.operator())
            }
        }
    }
}

impl std::error::Error for ParsingError {}

struct ChainBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl ChainBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        ChainBuilder { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parse a pipeline: command ('|' command)*
    ///
    /// Stages are collected first and linked back to front afterwards, so the chain depth
    /// never turns into recursion depth.
    fn parse_pipeline(&mut self) -> Result<Vec<Command>, ParsingError> {
        let mut stages = vec![self.parse_command()];
        while let Some(Token::PipeOp) = self.peek() {
            self.consume();
            stages.push(self.parse_command());
        }

        let dangling = stages.iter().filter(|stage| stage.is_empty()).find_map(|stage| {
            RedirectSlot::ALL
                .into_iter()
                .find(|slot| stage.redirect(*slot).is_some())
        });
        if let Some(slot) = dangling {
            return Err(ParsingError::MissingCommand(slot));
        }
        if stages.len() > 1 && stages.iter().any(Command::is_empty) {
            return Err(ParsingError::EmptyStage);
        }
        Ok(stages)
    }

    /// Parse one stage, stopping before the next `|` or at the end of the line.
    fn parse_command(&mut self) -> Command {
        let mut command = Command::default();

        while let Some(token) = self.peek() {
            if *token == Token::PipeOp {
                break;
            }
            match self.consume() {
                Some(Token::Word(word)) => {
                    if command.name.is_empty() {
                        command.name = word;
                    } else {
                        command.arguments.push(word);
                    }
                }
                Some(Token::Redirect(slot, path)) => {
                    let path = if path.is_empty() {
                        self.parse_redirect_target()
                    } else {
                        path
                    };
                    command.set_redirect(slot, path);
                }
                // The marker was already picked up from the end of the line.
                Some(Token::Background) | Some(Token::PipeOp) | None => {}
            }
        }
        command
    }

    /// Target of a bare `<`, `>` or `>>`: the next word if there is one, else empty.
    fn parse_redirect_target(&mut self) -> String {
        match self.peek() {
            Some(Token::Word(_)) => match self.consume() {
                Some(Token::Word(path)) => path,
                _ => String::new(),
            },
            _ => String::new(),
        }
    }
}

/// Parse a raw input line into a chain of commands.
///
/// A blank line yields the empty sentinel command. A trailing `&` marks the final stage as
/// background, a trailing `?` marks it as a completion request.
pub fn parse(line: &str) -> Result<Command, ParsingError> {
    let line = line.trim_matches(&SPLITTERS[..]);
    let tokens = lexer::split_into_tokens(line);
    let stages = ChainBuilder::from(tokens).parse_pipeline()?;

    let mut chain: Option<Command> = None;
    for mut stage in stages.into_iter().rev() {
        match chain.take() {
            Some(next) => stage.next = Some(Box::new(next)),
            None => {
                stage.auto_complete = line.ends_with('?');
                stage.background = line.ends_with('&');
            }
        }
        chain = Some(stage);
    }
    let chain = chain.unwrap_or_default();
    log::debug!("parsed {:?} into {} stage(s)", line, chain.len());
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<&str> {
        cmd.arguments.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_simple_command() {
        let cmd = parse("ls -la").unwrap();
        assert_eq!(cmd.name, "ls");
        assert_eq!(args(&cmd), vec!["-la"]);
        assert!(cmd.redirects.iter().all(Option::is_none));
        assert!(!cmd.background);
        assert!(cmd.next.is_none());
    }

    #[test]
    fn test_three_stage_pipeline() {
        let cmd = parse("cat a.txt | grep foo | wc -l").unwrap();
        assert_eq!(cmd.len(), 3);
        let stages: Vec<&Command> = cmd.stages().collect();
        assert_eq!(stages[0].name, "cat");
        assert_eq!(stages[1].name, "grep");
        assert_eq!(args(stages[1]), vec!["foo"]);
        assert_eq!(stages[2].name, "wc");
        assert_eq!(args(stages[2]), vec!["-l"]);
    }

    #[test]
    fn test_spaced_redirects() {
        let cmd = parse("sort < in.txt > out.txt").unwrap();
        assert_eq!(cmd.name, "sort");
        assert!(cmd.arguments.is_empty());
        assert_eq!(cmd.redirect(RedirectSlot::Input), Some("in.txt"));
        assert_eq!(cmd.redirect(RedirectSlot::Truncate), Some("out.txt"));
        assert_eq!(cmd.redirect(RedirectSlot::Append), None);
    }

    #[test]
    fn test_glued_redirects() {
        let cmd = parse("sort <in.txt >out.txt").unwrap();
        assert_eq!(cmd.redirect(RedirectSlot::Input), Some("in.txt"));
        assert_eq!(cmd.redirect(RedirectSlot::Truncate), Some("out.txt"));
    }

    #[test]
    fn test_append_in_background() {
        let cmd = parse("echo hi >> log.txt &").unwrap();
        assert_eq!(cmd.name, "echo");
        assert_eq!(args(&cmd), vec!["hi"]);
        assert_eq!(cmd.redirect(RedirectSlot::Append), Some("log.txt"));
        assert_eq!(cmd.redirect(RedirectSlot::Truncate), None);
        assert!(cmd.background);
    }

    #[test]
    fn test_background_marks_final_stage() {
        let cmd = parse("sleep 5 | cat &").unwrap();
        assert!(!cmd.background);
        assert!(cmd.last().background);
        assert!(cmd.is_background());
        assert_eq!(args(cmd.last()), Vec::<&str>::new());
    }

    #[test]
    fn test_redirect_at_end_has_empty_path() {
        let cmd = parse("cat >").unwrap();
        assert_eq!(cmd.redirect(RedirectSlot::Truncate), Some(""));
    }

    #[test]
    fn test_redirect_does_not_swallow_operator() {
        let cmd = parse("cat < | wc").unwrap();
        assert_eq!(cmd.redirect(RedirectSlot::Input), Some(""));
        assert_eq!(cmd.len(), 2);
    }

    #[test]
    fn test_auto_complete_keeps_token() {
        let cmd = parse("ls /us?").unwrap();
        assert!(cmd.auto_complete);
        assert_eq!(args(&cmd), vec!["/us?"]);
    }

    #[test]
    fn test_quoted_arguments() {
        let cmd = parse("grep \"foo\" 'bar' \"\" \"odd'").unwrap();
        assert_eq!(args(&cmd), vec!["foo", "bar", "\"\"", "\"odd'"]);
    }

    #[test]
    fn test_blank_lines_are_empty_sentinel() {
        for line in ["", "   ", "\t \t"] {
            let cmd = parse(line).unwrap();
            assert!(cmd.is_empty());
            assert!(cmd.arguments.is_empty());
            assert!(cmd.next.is_none());
        }
    }

    #[test]
    fn test_empty_stages_are_rejected() {
        for line in ["|", "ls |", "| wc", "ls | | wc", "ls |   "] {
            assert_eq!(parse(line), Err(ParsingError::EmptyStage), "line {:?}", line);
        }
    }

    #[test]
    fn test_redirect_without_command_is_rejected() {
        assert_eq!(
            parse("> out.txt"),
            Err(ParsingError::MissingCommand(RedirectSlot::Truncate))
        );
        assert_eq!(
            parse("<in.txt &"),
            Err(ParsingError::MissingCommand(RedirectSlot::Input))
        );
        assert_eq!(
            parse("ls | >> log.txt"),
            Err(ParsingError::MissingCommand(RedirectSlot::Append))
        );
        assert_eq!(
            parse(">").unwrap_err().to_string(),
            "syntax error near unexpected token `>'"
        );
    }

    #[test]
    fn test_lone_ampersand_is_a_noop_line() {
        let cmd = parse("&").unwrap();
        assert!(cmd.is_empty());
        assert!(cmd.background);
    }

    #[test]
    fn test_round_trip_of_plain_command() {
        for line in ["ls -la /tmp", "git log --oneline -n 3", "true"] {
            let first = parse(line).unwrap();
            let rebuilt = std::iter::once(first.name.clone())
                .chain(first.arguments.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ");
            let second = parse(&rebuilt).unwrap();
            assert_eq!(first.name, second.name);
            assert_eq!(first.arguments, second.arguments);
        }
    }

    #[test]
    fn test_display_round_trips_whole_chain() {
        let first = parse("cat <in.txt | sort -r | uniq >>out.txt &").unwrap();
        let second = parse(&first.to_string()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_pipeline_does_not_overflow() {
        let line = vec!["cat"; 200_000].join(" | ");
        let cmd = parse(&line).unwrap();
        assert_eq!(cmd.len(), 200_000);
    }
}
