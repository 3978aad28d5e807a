#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Yap,    // print
    Fr,     // if
    NoCap,  // if
    Cap,    // else
    Bet,    // for
    Goon,   // while
    Bruh,   // function
    Solulu, // return
    Delulu, // try
    Oof,    // throw
    Pookie, // var
    Goated, // priority
    Ohio,   // null
    Yeet,   // array delete
    Yoink,  // array add
    Squad,  // array
    Sigma,  // class
    Ghost,  // exit
    Cook,   // program entry

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Dot,          // .
    Semicolon,    // ;

    // Operators
    Minus,        // -
    Plus,         // +
    Slash,        // /
    Star,         // *
    Bang,         // !
    Equal,        // =
    Less,         // <
    Greater,      // >
    BangEqual,    // !=
    EqualEqual,   // ==
    LessEqual,    // <=
    GreaterEqual, // >=

    // Literals
    Identifier,
    String,
    Number,

    Eof,
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident {
            "yap" => TokenKind::Yap,
            "fr" => TokenKind::Fr,
            "no_cap" => TokenKind::NoCap,
            "cap" => TokenKind::Cap,
            "bet" => TokenKind::Bet,
            "goon" => TokenKind::Goon,
            "bruh" => TokenKind::Bruh,
            "solulu" => TokenKind::Solulu,
            "delulu" => TokenKind::Delulu,
            "oof" => TokenKind::Oof,
            "pookie" => TokenKind::Pookie,
            "goated" => TokenKind::Goated,
            "ohio" => TokenKind::Ohio,
            "yeet" => TokenKind::Yeet,
            "yoink" => TokenKind::Yoink,
            "squad" => TokenKind::Squad,
            "sigma" => TokenKind::Sigma,
            "ghost" => TokenKind::Ghost,
            "cook" => TokenKind::Cook,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source lexeme; string literals drop their quotes and demoted number
    /// literals carry the integer spelling.
    pub text: String,
    pub is_float: bool,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            is_float: false,
            span,
        }
    }

    pub fn number(text: impl Into<String>, is_float: bool, span: Span) -> Self {
        Self {
            kind: TokenKind::Number,
            text: text.into(),
            is_float,
            span,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Short rendering used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::String => format!("string \"{}\"", self.text),
            TokenKind::Identifier => format!("identifier '{}'", self.text),
            TokenKind::Number => format!("number {}", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_covers_entry_and_print() {
        assert_eq!(TokenKind::keyword("cook"), Some(TokenKind::Cook));
        assert_eq!(TokenKind::keyword("yap"), Some(TokenKind::Yap));
        assert_eq!(TokenKind::keyword("no_cap"), Some(TokenKind::NoCap));
        assert_eq!(TokenKind::keyword("Cook"), None);
        assert_eq!(TokenKind::keyword("x"), None);
    }

    #[test]
    fn describes_tokens_for_diagnostics() {
        let span = Span::default();
        assert_eq!(Token::new(TokenKind::Eof, "", span).describe(), "end of input");
        assert_eq!(
            Token::new(TokenKind::Identifier, "x", span).describe(),
            "identifier 'x'"
        );
        assert_eq!(Token::new(TokenKind::Semicolon, ";", span).describe(), "';'");
    }
}
