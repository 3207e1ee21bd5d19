use std::str::FromStr;

use anyhow::Context;

use super::FloatingPoint;

/// Whitespace token stream over a text document.
/// Everything from a `#` to the end of its line is a comment and is skipped.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    tokens: Vec<(usize, &'a str)>,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        let tokens = input
            .lines()
            .enumerate()
            .flat_map(|(n, line)| {
                let body = match line.find('#') {
                    Some(pos) => &line[..pos],
                    None => line,
                };
                body.split_whitespace().map(move |t| (n + 1, t))
            })
            .collect();
        Self { tokens, cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Line number of the next token (or of the last one at the end of input)
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .map_or(0, |(n, _)| *n)
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.cursor).map(|(_, t)| *t)
    }

    pub fn next_token(&mut self) -> anyhow::Result<&'a str> {
        let (_, token) = self
            .tokens
            .get(self.cursor)
            .copied()
            .with_context(|| format!("unexpected end of input after line {}", self.line()))?;
        self.cursor += 1;
        Ok(token)
    }

    /// Consume the rest of the line holding the next token
    pub fn skip_line(&mut self) {
        let line = self.line();
        while self
            .tokens
            .get(self.cursor)
            .is_some_and(|(n, _)| *n == line)
        {
            self.cursor += 1;
        }
    }

    /// Consume `keyword` or fail with the offending token
    pub fn expect(&mut self, keyword: &str) -> anyhow::Result<()> {
        let line = self.line();
        let token = self.next_token()?;
        anyhow::ensure!(
            token == keyword,
            "expected section '{}' at line {}, found '{}'",
            keyword,
            line,
            token
        );
        Ok(())
    }

    pub fn parse<V: FromStr>(&mut self) -> anyhow::Result<V> {
        let line = self.line();
        let token = self.next_token()?;
        token
            .parse::<V>()
            .map_err(|_| anyhow::anyhow!("invalid value '{}' at line {}", token, line))
    }

    pub fn parse_usize(&mut self) -> anyhow::Result<usize> {
        self.parse::<usize>()
    }

    pub fn parse_isize(&mut self) -> anyhow::Result<isize> {
        self.parse::<isize>()
    }

    /// Read a scalar through `f64`
    pub fn parse_real<T: FloatingPoint>(&mut self) -> anyhow::Result<T> {
        let v = self.parse::<f64>()?;
        Ok(nalgebra::convert(v))
    }

    pub fn parse_reals<T: FloatingPoint>(&mut self, n: usize) -> anyhow::Result<Vec<T>> {
        (0..n).map(|_| self.parse_real()).collect()
    }
}
