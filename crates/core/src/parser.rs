//! Declaration-level Go parser.
//!
//! Reads the package clause, imports and `type` declarations of one file.
//! Function, variable and constant declarations are skipped wholesale.

use crate::ast::{
    ChanDir, FieldDecl, ImportSpec, InterfaceElem, Param, Signature, SourceFile, TypeDecl,
    TypeExpr,
};
use crate::error::SyntaxError;
use crate::lexer::{is_keyword, Spanned, Token};

pub fn parse(tokens: &[Spanned], filename: &str) -> Result<SourceFile, SyntaxError> {
    let mut p = Parser::new(tokens, filename);
    p.parse_file()
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    filename: String,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], filename: &str) -> Self {
        Parser {
            tokens,
            pos: 0,
            filename: filename.to_owned(),
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::parse(&self.filename, self.cur_line(), msg)
    }

    fn expect(&mut self, token: Token, display: &str) -> Result<(), SyntaxError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {:?}", display, self.peek())))
        }
    }

    fn expect_word(&mut self, expected: &str) -> Result<(), SyntaxError> {
        if self.is_word(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {:?}", expected, self.peek())))
        }
    }

    /// A statement terminator, or the end of the enclosing list/file.
    fn expect_terminator(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            Token::Semi => {
                self.advance();
                Ok(())
            }
            Token::Eof | Token::RParen | Token::RBrace => Ok(()),
            other => Err(self.err(format!("expected ';' or newline, got {:?}", other))),
        }
    }

    fn skip_semis(&mut self) {
        while self.peek() == &Token::Semi {
            self.advance();
        }
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Word(x) if x == w)
    }

    fn take_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            Token::Word(w) if !is_keyword(&w) => {
                self.advance();
                Ok(w)
            }
            other => Err(self.err(format!("expected identifier, got {:?}", other))),
        }
    }

    fn take_str(&mut self) -> Result<String, SyntaxError> {
        if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Ok(s)
        } else {
            Err(self.err(format!("expected string literal, got {:?}", self.peek())))
        }
    }

    // -- File structure ------------------------------------------

    fn parse_file(&mut self) -> Result<SourceFile, SyntaxError> {
        self.skip_semis();
        self.expect_word("package")?;
        let package = self.take_ident()?;
        self.expect_terminator()?;

        let mut imports = Vec::new();
        loop {
            self.skip_semis();
            if !self.is_word("import") {
                break;
            }
            self.advance();
            if self.peek() == &Token::LParen {
                self.advance();
                loop {
                    self.skip_semis();
                    if self.peek() == &Token::RParen {
                        self.advance();
                        break;
                    }
                    imports.push(self.parse_import_spec()?);
                    self.expect_terminator()?;
                }
            } else {
                imports.push(self.parse_import_spec()?);
            }
            self.expect_terminator()?;
        }

        let mut types = Vec::new();
        loop {
            self.skip_semis();
            match self.peek() {
                Token::Eof => break,
                Token::Word(w) if w == "type" => {
                    self.advance();
                    if self.peek() == &Token::LParen {
                        self.advance();
                        loop {
                            self.skip_semis();
                            if self.peek() == &Token::RParen {
                                self.advance();
                                break;
                            }
                            types.push(self.parse_type_spec()?);
                            self.expect_terminator()?;
                        }
                    } else {
                        types.push(self.parse_type_spec()?);
                    }
                    self.expect_terminator()?;
                }
                _ => self.skip_decl()?,
            }
        }

        Ok(SourceFile {
            name: self.filename.clone(),
            package,
            imports,
            types,
        })
    }

    fn parse_import_spec(&mut self) -> Result<ImportSpec, SyntaxError> {
        let line = self.cur_line();
        let name = match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                Some(w)
            }
            Token::Dot => {
                self.advance();
                Some(".".to_string())
            }
            _ => None,
        };
        let path = self.take_str()?;
        Ok(ImportSpec { name, path, line })
    }

    /// Skip one non-type top-level declaration by bracket balancing.
    fn skip_decl(&mut self) -> Result<(), SyntaxError> {
        let line = self.cur_line();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Eof => {
                    if depth > 0 {
                        return Err(SyntaxError::parse(
                            &self.filename,
                            line,
                            "unbalanced brackets in declaration",
                        ));
                    }
                    return Ok(());
                }
                Token::LBrace | Token::LBracket | Token::LParen => depth += 1,
                Token::RBrace | Token::RBracket | Token::RParen => {
                    if depth == 0 {
                        return Err(self.err(format!("unexpected {:?}", self.peek())));
                    }
                    depth -= 1;
                }
                Token::Semi if depth == 0 => {
                    self.advance();
                    return Ok(());
                }
                _ => {}
            }
            self.advance();
        }
    }

    // -- Type declarations ---------------------------------------

    fn parse_type_spec(&mut self) -> Result<TypeDecl, SyntaxError> {
        let line = self.cur_line();
        let name = self.take_ident()?;
        let type_params = if self.at_type_params() {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        let alias = if self.peek() == &Token::Assign {
            self.advance();
            true
        } else {
            false
        };
        let ty = self.parse_type()?;
        Ok(TypeDecl {
            name,
            type_params,
            alias,
            ty,
            line,
        })
    }

    /// `[` ident followed by something that cannot close an array length.
    fn at_type_params(&self) -> bool {
        self.peek() == &Token::LBracket
            && matches!(self.peek_at(1), Token::Word(_))
            && matches!(
                self.peek_at(2),
                Token::Word(_) | Token::Comma | Token::Tilde | Token::LBracket
            )
    }

    fn parse_type_params(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(Token::LBracket, "[")?;
        let mut names = Vec::new();
        let mut depth = 1usize;
        let mut at_name = true;
        loop {
            match self.peek().clone() {
                Token::Eof => return Err(self.err("unterminated type parameter list")),
                Token::LBracket | Token::LParen | Token::LBrace => depth += 1,
                Token::RBracket | Token::RParen | Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return Ok(names);
                    }
                }
                Token::Comma if depth == 1 => {
                    self.advance();
                    at_name = true;
                    continue;
                }
                Token::Word(w) if depth == 1 && at_name => names.push(w),
                _ => {}
            }
            at_name = false;
            self.advance();
        }
    }

    // -- Type expressions ----------------------------------------

    fn starts_type(&self) -> bool {
        match self.peek() {
            Token::Star | Token::LBracket | Token::LParen | Token::Arrow => true,
            Token::Word(w) => {
                !is_keyword(w)
                    || matches!(w.as_str(), "map" | "chan" | "func" | "struct" | "interface")
            }
            _ => false,
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, SyntaxError> {
        match self.peek().clone() {
            Token::Star => {
                self.advance();
                Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)))
            }
            Token::LBracket => {
                self.advance();
                match self.peek() {
                    Token::RBracket => {
                        self.advance();
                        Ok(TypeExpr::Slice(Box::new(self.parse_type()?)))
                    }
                    Token::Ellipsis => {
                        self.advance();
                        self.expect(Token::RBracket, "]")?;
                        Ok(TypeExpr::Array {
                            len: "...".to_string(),
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                    _ => {
                        let len = self.collect_array_len()?;
                        Ok(TypeExpr::Array {
                            len,
                            elem: Box::new(self.parse_type()?),
                        })
                    }
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(Token::RParen, ")")?;
                Ok(TypeExpr::Paren(Box::new(inner)))
            }
            Token::Arrow => {
                self.advance();
                self.expect_word("chan")?;
                Ok(TypeExpr::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.parse_type()?),
                })
            }
            Token::Word(w) => match w.as_str() {
                "map" => {
                    self.advance();
                    self.expect(Token::LBracket, "[")?;
                    let key = self.parse_type()?;
                    self.expect(Token::RBracket, "]")?;
                    let value = self.parse_type()?;
                    Ok(TypeExpr::Map {
                        key: Box::new(key),
                        value: Box::new(value),
                    })
                }
                "chan" => {
                    self.advance();
                    let dir = if self.peek() == &Token::Arrow {
                        self.advance();
                        ChanDir::Send
                    } else {
                        ChanDir::Both
                    };
                    Ok(TypeExpr::Chan {
                        dir,
                        elem: Box::new(self.parse_type()?),
                    })
                }
                "func" => {
                    self.advance();
                    Ok(TypeExpr::Func(self.parse_signature()?))
                }
                "struct" => {
                    self.advance();
                    Ok(TypeExpr::Struct(self.parse_struct_body()?))
                }
                "interface" => {
                    self.advance();
                    Ok(TypeExpr::Interface(self.parse_interface_body()?))
                }
                _ => self.parse_type_name(),
            },
            other => Err(self.err(format!("expected type, got {:?}", other))),
        }
    }

    fn parse_type_name(&mut self) -> Result<TypeExpr, SyntaxError> {
        let first = self.take_ident()?;
        let base = if self.peek() == &Token::Dot {
            self.advance();
            let name = self.take_ident()?;
            TypeExpr::Qualified {
                package: first,
                name,
            }
        } else {
            TypeExpr::Named(first)
        };
        if self.peek() != &Token::LBracket {
            return Ok(base);
        }
        self.advance();
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                    if self.peek() == &Token::RBracket {
                        self.advance();
                        break;
                    }
                }
                Token::RBracket => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(self.err(format!("expected ',' or ']', got {:?}", other)));
                }
            }
        }
        Ok(TypeExpr::Generic {
            base: Box::new(base),
            args,
        })
    }

    /// Array length expression up to the matching `]`, consumed.
    fn collect_array_len(&mut self) -> Result<String, SyntaxError> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let token = self.peek().clone();
            match &token {
                Token::Eof => return Err(self.err("unterminated array length")),
                Token::RBracket if depth == 0 => {
                    self.advance();
                    return Ok(text);
                }
                Token::LBracket | Token::LParen => depth += 1,
                Token::RBracket | Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            text.push_str(&token_text(&token));
            self.advance();
        }
    }

    fn parse_signature(&mut self) -> Result<Signature, SyntaxError> {
        let params = self.parse_params()?;
        let (results, paren_results) = if self.peek() == &Token::LParen {
            (self.parse_params()?, true)
        } else if self.starts_type() {
            (
                vec![Param {
                    name: None,
                    ty: self.parse_type()?,
                }],
                false,
            )
        } else {
            (Vec::new(), false)
        };
        Ok(Signature {
            params,
            results,
            paren_results,
        })
    }

    /// A parenthesized parameter list. Grouped names (`a, b int`) are kept
    /// as written: every name but the last becomes an unnamed `Named` entry.
    fn parse_params(&mut self) -> Result<Vec<Param>, SyntaxError> {
        self.expect(Token::LParen, "(")?;
        let mut params = Vec::new();
        loop {
            self.skip_semis();
            if self.peek() == &Token::RParen {
                self.advance();
                return Ok(params);
            }
            let param = if self.peek() == &Token::Ellipsis {
                self.advance();
                Param {
                    name: None,
                    ty: TypeExpr::Variadic(Box::new(self.parse_type()?)),
                }
            } else {
                let first = self.parse_type()?;
                let next = self.peek().clone();
                match (&first, &next) {
                    (_, Token::Comma) | (_, Token::RParen) => Param {
                        name: None,
                        ty: first,
                    },
                    (TypeExpr::Named(name), _) => {
                        let name = name.clone();
                        let ty = if self.peek() == &Token::Ellipsis {
                            self.advance();
                            TypeExpr::Variadic(Box::new(self.parse_type()?))
                        } else {
                            self.parse_type()?
                        };
                        Param {
                            name: Some(name),
                            ty,
                        }
                    }
                    (_, other) => {
                        return Err(self.err(format!(
                            "expected ',' or ')' in parameter list, got {:?}",
                            other
                        )));
                    }
                }
            };
            params.push(param);
            if self.peek() == &Token::Comma {
                self.advance();
            }
        }
    }

    fn parse_struct_body(&mut self) -> Result<Vec<FieldDecl>, SyntaxError> {
        self.expect(Token::LBrace, "{")?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis();
            if self.peek() == &Token::RBrace {
                self.advance();
                return Ok(fields);
            }
            fields.push(self.parse_field_decl()?);
            self.expect_terminator()?;
        }
    }

    fn parse_field_decl(&mut self) -> Result<FieldDecl, SyntaxError> {
        let line = self.cur_line();
        let (names, ty) = match self.peek().clone() {
            Token::Star => (Vec::new(), self.parse_type()?),
            Token::Word(w) => match self.peek_at(1) {
                Token::Dot => (Vec::new(), self.parse_type()?),
                Token::Semi | Token::RBrace | Token::Str(_) => {
                    (Vec::new(), self.parse_type()?)
                }
                Token::Comma => {
                    let mut names = vec![self.take_ident()?];
                    while self.peek() == &Token::Comma {
                        self.advance();
                        names.push(self.take_ident()?);
                    }
                    (names, self.parse_type()?)
                }
                Token::LBracket => {
                    // `Name [N]T` is a field; `Base[T]` is an embedded instantiation
                    let saved = self.pos;
                    self.advance();
                    match self.parse_type() {
                        Ok(ty) if self.at_field_end() => (vec![w], ty),
                        _ => {
                            self.pos = saved;
                            (Vec::new(), self.parse_type()?)
                        }
                    }
                }
                _ => {
                    let name = self.take_ident()?;
                    (vec![name], self.parse_type()?)
                }
            },
            other => return Err(self.err(format!("expected field declaration, got {:?}", other))),
        };
        let tag = if let Token::Str(s) = self.peek().clone() {
            self.advance();
            Some(s)
        } else {
            None
        };
        Ok(FieldDecl {
            names,
            ty,
            tag,
            line,
        })
    }

    fn at_field_end(&self) -> bool {
        matches!(self.peek(), Token::Semi | Token::RBrace | Token::Str(_))
    }

    fn parse_interface_body(&mut self) -> Result<Vec<InterfaceElem>, SyntaxError> {
        self.expect(Token::LBrace, "{")?;
        let mut elems = Vec::new();
        loop {
            self.skip_semis();
            if self.peek() == &Token::RBrace {
                self.advance();
                return Ok(elems);
            }
            if matches!(self.peek(), Token::Word(_)) && self.peek_at(1) == &Token::LParen {
                let name = self.take_ident()?;
                let sig = self.parse_signature()?;
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                let mut terms = Vec::new();
                loop {
                    let approx = if self.peek() == &Token::Tilde {
                        self.advance();
                        true
                    } else {
                        false
                    };
                    terms.push((approx, self.parse_type()?));
                    if matches!(self.peek(), Token::Op(op) if op == "|") {
                        self.advance();
                    } else {
                        break;
                    }
                }
                elems.push(InterfaceElem::Union(terms));
            }
            self.expect_terminator()?;
        }
    }
}

fn token_text(token: &Token) -> String {
    match token {
        Token::Word(w) | Token::Number(w) | Token::Op(w) => w.clone(),
        Token::Str(s) => format!("{:?}", s),
        Token::Char(c) => format!("'{}'", c),
        Token::LBrace => "{".into(),
        Token::RBrace => "}".into(),
        Token::LBracket => "[".into(),
        Token::RBracket => "]".into(),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
        Token::Comma => ", ".into(),
        Token::Dot => ".".into(),
        Token::Semi => ";".into(),
        Token::Colon => ":".into(),
        Token::Star => "*".into(),
        Token::Assign => "=".into(),
        Token::Tilde => "~".into(),
        Token::Ellipsis => "...".into(),
        Token::Arrow => "<-".into(),
        Token::Eof => String::new(),
    }
}
