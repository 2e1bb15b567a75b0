//! Shell-style wildcard matching for source names and path components.
//!
//! Supported syntax:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from the set or range
//! - `[!abc]` or `[^abc]` match one character NOT in the set
//! - `{a,b,c}` brace alternatives, nestable
//! - `\x` matches `x` literally
//!
//! A pattern is compiled once into a [`Wildcard`] and can then be matched
//! against many inputs. Matching is iterative: a failed attempt after `*`
//! resumes from the most recent star, so patterns like `*a*a*a*b` never
//! backtrack exponentially.

/// Check if a string contains glob metacharacters (`*`, `?`, `[`, `{`).
pub fn contains_glob(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Expand brace alternatives in a pattern.
///
/// `{a,b,c}` expands to one pattern per alternative; nested groups and
/// several groups in one pattern expand combinatorially. An unbalanced
/// brace is kept as a literal.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = outer_brace_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    split_alternatives(body)
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

/// Byte offsets of the first balanced top-level `{...}` group.
fn outer_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut open = None;

    for (i, c) in pattern.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|o| (o, i));
                }
            }
            _ => {}
        }
    }

    None
}

/// Split brace content on top-level commas.
fn split_alternatives(body: &str) -> Vec<&str> {
    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                alternatives.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    alternatives.push(&body[start..]);

    alternatives
}

#[derive(Debug, Clone, PartialEq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    /// Whether this single-character token accepts `c`.
    fn accepts(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyOne => true,
            Token::AnyRun => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Single(s) => *s == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

/// A compiled glob pattern for a single path component.
#[derive(Debug, Clone)]
pub struct Wildcard {
    alternatives: Vec<Vec<Token>>,
}

impl Wildcard {
    /// Compile a pattern, expanding braces up front.
    pub fn new(pattern: &str) -> Self {
        let alternatives = expand_braces(pattern)
            .iter()
            .map(|alt| compile(alt))
            .collect();
        Self { alternatives }
    }

    /// Check whether the whole input matches any alternative.
    pub fn matches(&self, input: &str) -> bool {
        let input: Vec<char> = input.chars().collect();
        self.alternatives
            .iter()
            .any(|tokens| match_tokens(tokens, &input))
    }
}

fn compile(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::AnyOne);
                i += 1;
            }
            '[' => match parse_class(&chars[i..]) {
                Some((class, consumed)) => {
                    tokens.push(class);
                    i += consumed;
                }
                // Unclosed bracket is literal
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            '\\' if i + 1 < chars.len() => {
                tokens.push(Token::Literal(chars[i + 1]));
                i += 2;
            }
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

/// Parse `[...]` at the start of `chars`, returning the class and its length.
fn parse_class(chars: &[char]) -> Option<(Token, usize)> {
    let mut idx = 1;
    let mut negated = false;
    if matches!(chars.get(idx), Some('!' | '^')) {
        negated = true;
        idx += 1;
    }

    // `]` directly after the opener is a member, not the terminator
    let first = idx;
    let mut items = Vec::new();

    while idx < chars.len() {
        let c = chars[idx];
        if c == ']' && idx > first {
            return Some((Token::Class { negated, items }, idx + 1));
        }
        if idx + 2 < chars.len() && chars[idx + 1] == '-' && chars[idx + 2] != ']' {
            items.push(ClassItem::Range(c, chars[idx + 2]));
            idx += 3;
        } else {
            items.push(ClassItem::Single(c));
            idx += 1;
        }
    }

    None
}

fn match_tokens(tokens: &[Token], input: &[char]) -> bool {
    let mut t = 0;
    let mut i = 0;
    // Token index after the latest star, and the input offset it resumes from.
    let mut resume: Option<(usize, usize)> = None;

    while i < input.len() {
        match tokens.get(t) {
            Some(Token::AnyRun) => {
                resume = Some((t + 1, i));
                t += 1;
                continue;
            }
            Some(token) if token.accepts(input[i]) => {
                t += 1;
                i += 1;
                continue;
            }
            _ => {}
        }

        match resume {
            Some((star_next, star_at)) => {
                t = star_next;
                i = star_at + 1;
                resume = Some((star_next, star_at + 1));
            }
            None => return false,
        }
    }

    tokens[t..].iter().all(|token| *token == Token::AnyRun)
}
