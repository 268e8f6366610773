use std::fmt;

use crate::span::Span;

pub const KEYWORDS: [&str; 9] = [
    "var", "return", "const", "repeat", "until", "do", "end", "func", "log",
];

const OPERATOR_CHARS: &str = "+-*/=<>!&|";
const DELIMITER_CHARS: &str = ";,()[]{}:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Assign,
    Identifier,
    Number,
    Operator,
    Delimiter,
    Question,
    String,
    /// Символ, который не подошёл ни под одно правило
    Unknown,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Keyword => "KEYWORD",
            Self::Assign => "ASSIGN",
            Self::Identifier => "IDENTIFIER",
            Self::Number => "NUMBER",
            Self::Operator => "OPERATOR",
            Self::Delimiter => "DELIMITER",
            Self::Question => "QUESTION",
            Self::String => "STRING",
            Self::Unknown => "UNKNOWN",
            Self::Eof => "EOF",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Текст лексемы как в исходнике; у EOF текста нет
    pub text: Option<String>,
    pub span: Span,
}

impl Token {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Совпадает ли токен и по категории, и по тексту
    pub fn is(&self, kind: TokenKind, lexeme: &str) -> bool {
        self.kind == kind && self.text() == Some(lexeme)
    }
}

/// Правило сканера: сколько байт с начала `rest` оно забирает
type Matcher = fn(&str) -> Option<usize>;

/// Правила в порядке приоритета. `None` - совпадение выбрасывается (пробелы).
/// Ключевые слова стоят раньше идентификаторов, поэтому `var` никогда не станет
/// IDENTIFIER, а `variable` не станет KEYWORD (слово проверяется целиком).
const RULES: [(Option<TokenKind>, Matcher); 10] = [
    (Some(TokenKind::Keyword), match_keyword),
    (Some(TokenKind::Identifier), match_identifier),
    (Some(TokenKind::Assign), match_assign),
    (Some(TokenKind::Number), match_number),
    (Some(TokenKind::Operator), match_operator),
    (Some(TokenKind::Delimiter), match_delimiter),
    (Some(TokenKind::Question), match_question),
    (Some(TokenKind::String), match_string),
    (None, match_whitespace),
    (Some(TokenKind::Unknown), match_any),
];

/// Разбивает исходник на токены. Никогда не падает: всё, что не распознано,
/// превращается в UNKNOWN и будет отвергнуто парсером.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    let mut line = 1;
    let mut column = 1;

    while position < source.len() {
        let rest = &source[position..];
        let (kind, len) = RULES
            .iter()
            .find_map(|(kind, matcher)| matcher(rest).map(|len| (*kind, len)))
            .unwrap_or((Some(TokenKind::Unknown), first_char_len(rest)));

        let lexeme = &rest[..len];
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                text: Some(lexeme.to_string()),
                span: Span {
                    line,
                    column,
                    start: position,
                    end: position + len,
                },
            });
        }

        for ch in lexeme.chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        position += len;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: None,
        span: Span {
            line,
            column,
            start: position,
            end: position,
        },
    });
    tokens
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn first_char_len(rest: &str) -> usize {
    rest.chars().next().map_or(0, char::len_utf8)
}

fn take_while(rest: &str, pred: impl Fn(char) -> bool) -> usize {
    rest.find(|ch: char| !pred(ch)).unwrap_or(rest.len())
}

fn match_keyword(rest: &str) -> Option<usize> {
    let len = match_identifier(rest)?;
    KEYWORDS.contains(&&rest[..len]).then_some(len)
}

fn match_identifier(rest: &str) -> Option<usize> {
    let first = rest.chars().next()?;
    if !is_ident_start(first) {
        return None;
    }
    Some(take_while(rest, is_ident_char))
}

fn match_assign(rest: &str) -> Option<usize> {
    rest.starts_with(":=").then_some(2)
}

fn match_number(rest: &str) -> Option<usize> {
    let digits = take_while(rest, |ch| ch.is_ascii_digit());
    if digits == 0 {
        return None;
    }

    // Дробная часть только если после точки есть цифра: `1.` это NUMBER и UNKNOWN
    let after = &rest[digits..];
    if let Some(fraction) = after.strip_prefix('.') {
        let fraction_digits = take_while(fraction, |ch| ch.is_ascii_digit());
        if fraction_digits > 0 {
            return Some(digits + 1 + fraction_digits);
        }
    }
    Some(digits)
}

fn match_operator(rest: &str) -> Option<usize> {
    let len = take_while(rest, |ch| OPERATOR_CHARS.contains(ch));
    (len > 0).then_some(len)
}

fn match_delimiter(rest: &str) -> Option<usize> {
    let first = rest.chars().next()?;
    DELIMITER_CHARS.contains(first).then_some(1)
}

fn match_question(rest: &str) -> Option<usize> {
    rest.starts_with('?').then_some(1)
}

fn match_string(rest: &str) -> Option<usize> {
    let body = rest.strip_prefix('"')?;
    // без закрывающей кавычки это не строка
    body.find('"').map(|close| close + 2)
}

fn match_whitespace(rest: &str) -> Option<usize> {
    let len = take_while(rest, char::is_whitespace);
    (len > 0).then_some(len)
}

fn match_any(rest: &str) -> Option<usize> {
    let len = first_char_len(rest);
    (len > 0).then_some(len)
}
