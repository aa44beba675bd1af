use std::io::{self, BufRead};

/// One tokenized line of a procedure script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    /// 1-based line number in the source.
    pub number: usize,
    args: Vec<String>,
}

impl ScriptLine {
    pub fn new(number: usize, args: Vec<String>) -> Self {
        Self { number, args }
    }

    pub fn n_args(&self) -> usize {
        self.args.len()
    }

    pub fn has_arg(&self, index: usize) -> bool {
        index < self.args.len()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Returns the argument, or an empty string if it is absent.
    pub fn arg_str(&self, index: usize) -> &str {
        self.arg(index).unwrap_or("")
    }

    pub fn arg_f64(&self, index: usize) -> Option<f64> {
        self.arg(index)?.parse().ok()
    }

    pub fn arg_i64(&self, index: usize) -> Option<i64> {
        self.arg(index)?.parse().ok()
    }

    /// Returns all arguments from `start` onwards.
    pub fn args_from(&self, start: usize) -> &[String] {
        self.args.get(start..).unwrap_or(&[])
    }

    /// Case-insensitive comparison of the first argument.
    pub fn is(&self, keyword: &str) -> bool {
        self.arg_str(0).eq_ignore_ascii_case(keyword)
    }
}

/// Splits a raw line into arguments.
///
/// Arguments are separated by whitespace or commas. Single or double quotes group text
/// (including separators) into one argument, and an unquoted `#` starts a comment.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted_arg = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    quoted_arg = true;
                }
                '#' => break,
                c if c.is_whitespace() || c == ',' => {
                    if !current.is_empty() || quoted_arg {
                        args.push(std::mem::take(&mut current));
                    }
                    quoted_arg = false;
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() || quoted_arg {
        args.push(current);
    }

    args
}

/// Sequential reader over the tokenized, non-blank lines of a procedure script.
#[derive(Debug, Clone)]
pub struct ScriptReader {
    lines: Vec<ScriptLine>,
    pos: usize,
}

impl ScriptReader {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| ScriptLine::new(i + 1, tokenize_line(line)))
            .filter(|line| line.n_args() > 0)
            .collect();
        Self { lines, pos: 0 }
    }

    pub fn from_reader(reader: &mut impl BufRead) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::new(&text))
    }

    /// Returns the next non-blank line, or `None` at end of input.
    pub fn next_line(&mut self) -> Option<ScriptLine> {
        let line = self.lines.get(self.pos).cloned();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    pub fn peek_line(&self) -> Option<&ScriptLine> {
        self.lines.get(self.pos)
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Line number of the most recently returned line, or 0 before the first read.
    pub fn last_line_number(&self) -> usize {
        match self.pos {
            0 => 0,
            n => self.lines[n - 1].number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_whitespace_and_commas() {
        assert_eq!(
            tokenize_line("  RangeX  0.0, 10.0,0.05 "),
            vec!["RangeX", "0.0", "10.0", "0.05"]
        );
    }

    #[test]
    fn tokenize_groups_quoted_text_and_strips_comments() {
        assert_eq!(
            tokenize_line("Select  'My Site'  # trailing comment"),
            vec!["Select", "My Site"]
        );
        assert_eq!(
            tokenize_line("Value \"a + b\" 'x#y'"),
            vec!["Value", "a + b", "x#y"]
        );
    }

    #[test]
    fn tokenize_keeps_empty_quoted_arguments() {
        assert_eq!(tokenize_line("Export ''"), vec!["Export", ""]);
    }

    #[test]
    fn reader_skips_blank_and_comment_lines_and_tracks_numbers() {
        let mut reader = ScriptReader::new("\n# header\nSelect 'A'\n\n  EndSelect\n");
        let first = reader.next_line().unwrap();
        assert_eq!(first.number, 3);
        assert!(first.is("select"));
        assert_eq!(first.arg(1), Some("A"));
        assert_eq!(reader.peek_line().unwrap().number, 5);
        let second = reader.next_line().unwrap();
        assert!(second.is("EndSelect"));
        assert_eq!(reader.last_line_number(), 5);
        assert!(reader.is_eof());
        assert!(reader.next_line().is_none());
    }

    #[test]
    fn typed_argument_accessors() {
        let line = ScriptLine::new(1, tokenize_line("Bins 1 2.5 x"));
        assert_eq!(line.n_args(), 4);
        assert_eq!(line.arg_i64(1), Some(1));
        assert_eq!(line.arg_f64(2), Some(2.5));
        assert_eq!(line.arg_f64(3), None);
        assert!(!line.has_arg(4));
        assert_eq!(line.arg_str(9), "");
        assert_eq!(line.args_from(2).len(), 2);
        assert!(line.args_from(10).is_empty());
    }
}
