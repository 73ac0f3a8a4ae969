//! Lexer for the Java subset using logos

use crate::error::ParseError;
use logos::{FilterResult, Lexer as LogosLexer, Logos};
use std::ops::Range;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    // Declaration keywords
    #[token("package", priority = 10)]
    Package,
    #[token("import", priority = 10)]
    Import,
    #[token("class", priority = 10)]
    Class,
    #[token("public", priority = 10)]
    Public,
    #[token("private", priority = 10)]
    Private,
    #[token("protected", priority = 10)]
    Protected,
    #[token("static", priority = 10)]
    Static,
    #[token("final", priority = 10)]
    Final,

    // Primitive types
    #[token("int", priority = 10)]
    Int,
    #[token("long", priority = 10)]
    Long,
    #[token("double", priority = 10)]
    Double,
    #[token("boolean", priority = 10)]
    Boolean,
    #[token("void", priority = 10)]
    Void,

    // Control flow keywords
    #[token("if", priority = 10)]
    If,
    #[token("else", priority = 10)]
    Else,
    #[token("while", priority = 10)]
    While,
    #[token("do", priority = 10)]
    Do,
    #[token("for", priority = 10)]
    For,
    #[token("break", priority = 10)]
    Break,
    #[token("continue", priority = 10)]
    Continue,
    #[token("return", priority = 10)]
    Return,

    // Literal keywords
    #[token("true", priority = 10)]
    True,
    #[token("false", priority = 10)]
    False,
    #[token("null", priority = 10)]
    Null,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Assignment
    #[token("=", priority = 8)]
    Assign,
    #[token("+=", priority = 8)]
    PlusAssign,
    #[token("-=", priority = 8)]
    MinusAssign,
    #[token("*=", priority = 8)]
    StarAssign,
    #[token("/=", priority = 8)]
    SlashAssign,
    #[token("%=", priority = 8)]
    PercentAssign,
    #[token("++", priority = 8)]
    PlusPlus,
    #[token("--", priority = 8)]
    MinusMinus,

    // Arithmetic
    #[token("+", priority = 8)]
    Plus,
    #[token("-", priority = 8)]
    Minus,
    #[token("*", priority = 8)]
    Star,
    #[token("/", priority = 8)]
    Slash,
    #[token("%", priority = 8)]
    Percent,

    // Comparison
    #[token("==", priority = 8)]
    EqEq,
    #[token("!=", priority = 8)]
    NotEq,
    #[token("<", priority = 8)]
    Less,
    #[token("<=", priority = 8)]
    LessEq,
    #[token(">", priority = 8)]
    Greater,
    #[token(">=", priority = 8)]
    GreaterEq,

    // Logical
    #[token("&&", priority = 8)]
    AndAnd,
    #[token("||", priority = 8)]
    OrOr,
    #[token("!", priority = 8)]
    Bang,

    // Punctuation
    #[token(".", priority = 9)]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("@")]
    At,

    // Literals
    #[regex(r"[0-9]+", priority = 5, callback = |lex| lex.slice().parse::<u64>().ok())]
    Integer(u64),

    #[regex(r"[0-9]+[lL]", priority = 6, callback = |lex| {
        let s = lex.slice();
        s[..s.len() - 1].parse::<u64>().ok()
    })]
    LongInteger(u64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[dD]?", priority = 5, callback = parse_double)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[dD]?", priority = 5, callback = parse_double)]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, priority = 5, callback = |lex| {
        let s = lex.slice();
        process_string_escapes(&s[1..s.len() - 1])
    })]
    String(String),

    // Identifiers (after keywords to avoid conflicts)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", priority = 3)]
    Ident(&'a str),

    // Comments and whitespace (automatically skipped)
    #[regex(r"//[^\n]*", logos::skip)]
    #[token("/*", block_comment)]
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    Error,
}

/// Skip to the closing `*/`; an unclosed comment swallows the rest of the input as an error
fn block_comment<'a>(lex: &mut LogosLexer<'a, Token<'a>>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(())
        }
    }
}

fn parse_double<'a>(lex: &mut LogosLexer<'a, Token<'a>>) -> Option<f64> {
    lex.slice().trim_end_matches(|c| c == 'd' || c == 'D').parse::<f64>().ok()
}

/// Process escape sequences in strings; unknown escapes yield `None`
pub fn process_string_escapes(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('0') => result.push('\0'),
                _ => return None,
            }
        } else {
            result.push(ch);
        }
    }

    Some(result)
}

/// Human readable token description for error messages
pub fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Integer(n) => format!("integer {}", n),
        Token::LongInteger(n) => format!("long {}L", n),
        Token::Float(f) => format!("double {}", f),
        Token::String(s) => format!("string {:?}", s),
        Token::Error => "invalid token".to_string(),
        other => format!("'{}'", symbol(other)),
    }
}

fn symbol(token: &Token) -> &'static str {
    match token {
        Token::Package => "package",
        Token::Import => "import",
        Token::Class => "class",
        Token::Public => "public",
        Token::Private => "private",
        Token::Protected => "protected",
        Token::Static => "static",
        Token::Final => "final",
        Token::Int => "int",
        Token::Long => "long",
        Token::Double => "double",
        Token::Boolean => "boolean",
        Token::Void => "void",
        Token::If => "if",
        Token::Else => "else",
        Token::While => "while",
        Token::Do => "do",
        Token::For => "for",
        Token::Break => "break",
        Token::Continue => "continue",
        Token::Return => "return",
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::LBrace => "{",
        Token::RBrace => "}",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::Assign => "=",
        Token::PlusAssign => "+=",
        Token::MinusAssign => "-=",
        Token::StarAssign => "*=",
        Token::SlashAssign => "/=",
        Token::PercentAssign => "%=",
        Token::PlusPlus => "++",
        Token::MinusMinus => "--",
        Token::Plus => "+",
        Token::Minus => "-",
        Token::Star => "*",
        Token::Slash => "/",
        Token::Percent => "%",
        Token::EqEq => "==",
        Token::NotEq => "!=",
        Token::Less => "<",
        Token::LessEq => "<=",
        Token::Greater => ">",
        Token::GreaterEq => ">=",
        Token::AndAnd => "&&",
        Token::OrOr => "||",
        Token::Bang => "!",
        Token::Dot => ".",
        Token::Comma => ",",
        Token::Semicolon => ";",
        Token::Colon => ":",
        Token::Question => "?",
        Token::At => "@",
        _ => "?",
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    inner: LogosLexer<'a, Token<'a>>,
    peeked: Option<(Token<'a>, Range<usize>)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Next valid token; invalid input is reported as `Token::Error`
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if let Some((token, _)) = self.peeked.take() {
            Some(token)
        } else {
            self.inner.next().map(|t| t.unwrap_or(Token::Error))
        }
    }

    pub fn peek_token(&mut self) -> Option<&Token<'a>> {
        if self.peeked.is_none() {
            if let Some(token) = self.inner.next() {
                let span = self.inner.span();
                self.peeked = Some((token.unwrap_or(Token::Error), span));
            }
        }
        self.peeked.as_ref().map(|(token, _)| token)
    }

    pub fn span(&self) -> Range<usize> {
        if let Some((_, span)) = &self.peeked {
            span.clone()
        } else {
            self.inner.span()
        }
    }

    pub fn slice(&self) -> &'a str {
        self.inner.slice()
    }

    /// Lex the whole input, failing on the first invalid token
    pub fn tokenize(mut self) -> Result<Vec<(Token<'a>, Range<usize>)>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            let span = self.inner.span();
            if token == Token::Error {
                return Err(invalid_token(self.inner.source(), span));
            }
            tokens.push((token, span));
        }
        Ok(tokens)
    }
}

fn invalid_token(source: &str, span: Range<usize>) -> ParseError {
    let text = &source[span.clone()];
    if text.starts_with('"') {
        if text.ends_with('"') && text.len() > 1 {
            ParseError::InvalidEscape(text.to_string())
        } else {
            ParseError::UnclosedDelimiter("\"".to_string())
        }
    } else if text.starts_with(|c: char| c.is_ascii_digit()) {
        ParseError::InvalidNumber(text.to_string())
    } else {
        ParseError::UnexpectedToken {
            position: span.start,
            expected: "valid token".to_string(),
            found: format!("{:?}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_types() {
        let mut lexer = Lexer::new("public static int long double boolean void class");
        assert_eq!(lexer.next_token(), Some(Token::Public));
        assert_eq!(lexer.next_token(), Some(Token::Static));
        assert_eq!(lexer.next_token(), Some(Token::Int));
        assert_eq!(lexer.next_token(), Some(Token::Long));
        assert_eq!(lexer.next_token(), Some(Token::Double));
        assert_eq!(lexer.next_token(), Some(Token::Boolean));
        assert_eq!(lexer.next_token(), Some(Token::Void));
        assert_eq!(lexer.next_token(), Some(Token::Class));
        assert_eq!(lexer.next_token(), None);
    }

    #[test]
    fn test_identifiers_shadowing_keywords() {
        let mut lexer = Lexer::new("integer __probe String doIt");
        assert_eq!(lexer.next_token(), Some(Token::Ident("integer")));
        assert_eq!(lexer.next_token(), Some(Token::Ident("__probe")));
        assert_eq!(lexer.next_token(), Some(Token::Ident("String")));
        assert_eq!(lexer.next_token(), Some(Token::Ident("doIt")));
    }

    #[test]
    fn test_number_literals() {
        let mut lexer = Lexer::new("42 7L 3.25 1.0e20 2e3");
        assert_eq!(lexer.next_token(), Some(Token::Integer(42)));
        assert_eq!(lexer.next_token(), Some(Token::LongInteger(7)));
        assert_eq!(lexer.next_token(), Some(Token::Float(3.25)));
        assert_eq!(lexer.next_token(), Some(Token::Float(1.0e20)));
        assert_eq!(lexer.next_token(), Some(Token::Float(2000.0)));
    }

    #[test]
    fn test_compound_operators() {
        let mut lexer = Lexer::new("+= ++ + <= < && !=");
        assert_eq!(lexer.next_token(), Some(Token::PlusAssign));
        assert_eq!(lexer.next_token(), Some(Token::PlusPlus));
        assert_eq!(lexer.next_token(), Some(Token::Plus));
        assert_eq!(lexer.next_token(), Some(Token::LessEq));
        assert_eq!(lexer.next_token(), Some(Token::Less));
        assert_eq!(lexer.next_token(), Some(Token::AndAnd));
        assert_eq!(lexer.next_token(), Some(Token::NotEq));
    }

    #[test]
    fn test_comments_are_skipped() {
        let mut lexer = Lexer::new("return // trailing\n /* block ** */ x;");
        assert_eq!(lexer.next_token(), Some(Token::Return));
        assert_eq!(lexer.next_token(), Some(Token::Ident("x")));
        assert_eq!(lexer.next_token(), Some(Token::Semicolon));
    }

    #[test]
    fn test_block_comments_with_stars() {
        let mut lexer = Lexer::new("/** Clamp. */ int /* a * b */ x /*\n * line\n **/ ;");
        assert_eq!(lexer.next_token(), Some(Token::Int));
        assert_eq!(lexer.next_token(), Some(Token::Ident("x")));
        assert_eq!(lexer.next_token(), Some(Token::Semicolon));
        assert_eq!(lexer.next_token(), None);
    }

    #[test]
    fn test_unclosed_block_comment() {
        let err = Lexer::new("int x; /* never closed").tokenize().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { position: 7, .. }));
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new(r#""a\"b\n""#);
        assert_eq!(lexer.next_token(), Some(Token::String("a\"b\n".to_string())));
    }

    #[test]
    fn test_tokenize_reports_invalid_input() {
        let err = Lexer::new("int x = #;").tokenize().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { position: 8, .. }));
    }
}
