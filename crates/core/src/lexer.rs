use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, told apart by the parser
    Word(String),
    /// String literal, interpreted or raw (content without quotes, escapes resolved)
    Str(String),
    /// Rune literal (content without quotes, escapes kept verbatim)
    Char(String),
    /// Numeric literal, kept as written
    Number(String),
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    Semi,
    Colon,
    Star,
    Assign,
    Tilde,
    Ellipsis,
    /// `<-`
    Arrow,
    /// Any other operator; only ever skipped by the parser
    Op(String),
    // End of input
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

const MULTI_CHAR_OPS: [&str; 24] = [
    "<<=", ">>=", "&^=", "&&", "||", "++", "--", "==", "!=", "<=", ">=", ":=", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&^", "<-",
];

/// Whether a newline directly after `token` ends the statement.
fn ends_statement(token: &Token) -> bool {
    match token {
        Token::Word(w) => {
            !is_keyword(w) || matches!(w.as_str(), "break" | "continue" | "fallthrough" | "return")
        }
        Token::Str(_) | Token::Char(_) | Token::Number(_) => true,
        Token::RParen | Token::RBracket | Token::RBrace => true,
        Token::Op(op) => op == "++" || op == "--",
        _ => false,
    }
}

pub fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "break"
            | "case"
            | "chan"
            | "const"
            | "continue"
            | "default"
            | "defer"
            | "else"
            | "fallthrough"
            | "for"
            | "func"
            | "go"
            | "goto"
            | "if"
            | "import"
            | "interface"
            | "map"
            | "package"
            | "range"
            | "return"
            | "select"
            | "struct"
            | "switch"
            | "type"
            | "var"
    )
}

fn insert_semi(tokens: &mut Vec<Spanned>, line: u32) {
    if tokens.last().is_some_and(|t| ends_statement(&t.token)) {
        tokens.push(Spanned {
            token: Token::Semi,
            line,
        });
    }
}

/// Tokenize Go source, applying automatic semicolon insertion.
pub fn lex(src: &str, filename: &str) -> Result<Vec<Spanned>, SyntaxError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let mut tokens: Vec<Spanned> = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    while pos < chars.len() {
        let c = chars[pos];

        // Line comment; the terminating newline is handled as whitespace
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        // Block comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1] == '*' {
            let start_line = line;
            pos += 2;
            loop {
                if pos >= chars.len() {
                    return Err(SyntaxError::lex(
                        filename,
                        start_line,
                        "unterminated block comment",
                    ));
                }
                if chars[pos] == '\n' {
                    line += 1;
                }
                if chars[pos] == '*' && pos + 1 < chars.len() && chars[pos + 1] == '/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            if line > start_line {
                insert_semi(&mut tokens, start_line);
            }
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            if c == '\n' {
                insert_semi(&mut tokens, line);
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;

        // Interpreted string literal
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() || chars[pos] == '\n' {
                    return Err(SyntaxError::lex(
                        filename,
                        tok_line,
                        "unterminated string literal",
                    ));
                }
                let sc = chars[pos];
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        return Err(SyntaxError::lex(
                            filename,
                            tok_line,
                            "unterminated escape in string",
                        ));
                    }
                    match chars[pos] {
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        // Raw string literal
        if c == '`' {
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != '`' {
                if chars[pos] == '\n' {
                    line += 1;
                }
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(SyntaxError::lex(
                    filename,
                    tok_line,
                    "unterminated raw string literal",
                ));
            }
            // carriage returns are discarded from raw strings
            let s: String = chars[start..pos].iter().filter(|&&ch| ch != '\r').collect();
            pos += 1;
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
            });
            continue;
        }

        // Rune literal
        if c == '\'' {
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != '\'' {
                if chars[pos] == '\n' {
                    return Err(SyntaxError::lex(
                        filename,
                        tok_line,
                        "unterminated rune literal",
                    ));
                }
                if chars[pos] == '\\' {
                    pos += 1;
                }
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(SyntaxError::lex(
                    filename,
                    tok_line,
                    "unterminated rune literal",
                ));
            }
            let s: String = chars[start..pos].iter().collect();
            pos += 1;
            tokens.push(Spanned {
                token: Token::Char(s),
                line: tok_line,
            });
            continue;
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit())
        {
            let start = pos;
            while pos < chars.len()
                && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_' || chars[pos] == '.')
            {
                pos += 1;
            }
            let s: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Number(s),
                line: tok_line,
            });
            continue;
        }

        // Identifier / keyword
        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                line: tok_line,
            });
            continue;
        }

        // Multi-character operators
        if let Some(op) = MULTI_CHAR_OPS.iter().chain(["..."].iter()).find(|op| {
            let n = op.chars().count();
            pos + n <= chars.len() && chars[pos..pos + n].iter().copied().eq(op.chars())
        }) {
            let token = match *op {
                "..." => Token::Ellipsis,
                "<-" => Token::Arrow,
                other => Token::Op(other.to_owned()),
            };
            pos += op.chars().count();
            tokens.push(Spanned {
                token,
                line: tok_line,
            });
            continue;
        }

        let token = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '.' => Token::Dot,
            ';' => Token::Semi,
            ':' => Token::Colon,
            '*' => Token::Star,
            '=' => Token::Assign,
            '~' => Token::Tilde,
            '+' | '-' | '/' | '%' | '&' | '|' | '^' | '<' | '>' | '!' => Token::Op(c.to_string()),
            _ => {
                return Err(SyntaxError::lex(
                    filename,
                    tok_line,
                    format!("unexpected character '{}'", c),
                ));
            }
        };
        pos += 1;
        tokens.push(Spanned {
            token,
            line: tok_line,
        });
    }

    insert_semi(&mut tokens, line);
    tokens.push(Spanned {
        token: Token::Eof,
        line,
    });
    Ok(tokens)
}
