use gslang_common::diagnostics::DiagnosticKind;
use gslang_common::token::{Token, TokenKind, TokenValue};
use gslang_lexer::Lexer;

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize("test.gs", source)
        .expect("lexing should succeed")
        .iter()
        .map(|t| t.kind)
        .collect()
}

fn check_int(token: &Token, expected: i64) {
    assert_eq!(token.kind, TokenKind::IntLiteral, "token {token:?}");
    assert_eq!(token.value, Some(TokenValue::Int(expected)));
}

fn check_float(token: &Token, expected: f64) {
    assert_eq!(token.kind, TokenKind::FloatLiteral, "token {token:?}");
    assert_eq!(token.value, Some(TokenValue::Float(expected)));
}

#[test]
fn numbers() {
    let tokens =
        Lexer::tokenize("test.gs", "12.5 125 0x100 0X200 1.2E+10 12.5E-10 12.5E2").unwrap();

    check_float(&tokens[0], 12.5);
    check_int(&tokens[1], 125);
    check_int(&tokens[2], 0x100);
    check_int(&tokens[3], 0x200);
    check_float(&tokens[4], 1.2e10);
    check_float(&tokens[5], 12.5e-10);
    check_float(&tokens[6], 1250.0);
    assert_eq!(tokens[7].kind, TokenKind::Eof);
}

#[test]
fn identifiers() {
    let tokens = Lexer::tokenize("test.gs", "hello world\n\n _hello123").unwrap();
    assert_eq!(tokens[0].text(), "hello");
    assert_eq!(tokens[1].text(), "world");
    assert_eq!(tokens[2].text(), "_hello123");
    assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Ident));
}

#[test]
fn keywords_are_not_identifier_prefixes() {
    let tokens = Lexer::tokenize("test.gs", "int32 int64 int32int64").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Int32);
    assert_eq!(tokens[1].kind, TokenKind::Int64);
    assert_eq!(tokens[2].kind, TokenKind::Ident);
    assert_eq!(tokens[2].text(), "int32int64");
}

#[test]
fn booleans() {
    assert_eq!(
        kinds("true false"),
        vec![TokenKind::True, TokenKind::False, TokenKind::Eof]
    );
}

#[test]
fn labels() {
    let tokens = Lexer::tokenize("test.gs", "Target: x").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Label);
    assert_eq!(tokens[0].text(), "Target");
    assert_eq!(tokens[1].kind, TokenKind::Ident);
}

#[test]
fn string_with_escaped_quotes() {
    let tokens = Lexer::tokenize("test.gs", r#""hell \"world\"""#).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    assert_eq!(tokens[0].text(), "hell \"world\"");
}

#[test]
fn single_quoted_string_and_backslash_escape() {
    let tokens = Lexer::tokenize("test.gs", r"'a \' b \\ c'").unwrap();
    assert_eq!(tokens[0].text(), r"a ' b \ c");
}

#[test]
fn line_and_block_comments() {
    let source = "//\"hell \"world\"\"\n/*********/\n[]\n";
    let tokens = Lexer::tokenize("test.gs", source).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Comment);
    assert_eq!(tokens[0].text(), "\"hell \"world\"\"");
    assert_eq!(tokens[1].kind, TokenKind::Comment);
    assert_eq!(tokens[1].text(), "*******");
    assert_eq!(tokens[2].kind, TokenKind::LBracket);
    assert_eq!(tokens[3].kind, TokenKind::RBracket);
}

#[test]
fn block_comments_nest() {
    let tokens = Lexer::tokenize("test.gs", "/* outer /* inner */ outer */ x").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Comment);
    assert_eq!(tokens[0].text(), " outer /* inner */ outer ");
    assert_eq!(tokens[1].text(), "x");
}

#[test]
fn arrow_and_operators() {
    assert_eq!(
        kinds("-> - + | &"),
        vec![
            TokenKind::Arrow,
            TokenKind::Minus,
            TokenKind::Plus,
            TokenKind::Pipe,
            TokenKind::Amp,
            TokenKind::Eof
        ]
    );
}

#[test]
fn punctuation() {
    assert_eq!(
        kinds("{ } ( ) [ ] ; , . @"),
        vec![
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::LBracket,
            TokenKind::RBracket,
            TokenKind::Semicolon,
            TokenKind::Comma,
            TokenKind::Dot,
            TokenKind::At,
            TokenKind::Eof
        ]
    );
}

#[test]
fn peek_is_idempotent() {
    let mut lexer = Lexer::new("test.gs", "int32 float64");
    let first = lexer.peek().unwrap();
    let second = lexer.peek().unwrap();
    assert_eq!(first, second);
    let consumed = lexer.next().unwrap();
    assert_eq!(consumed, first);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Float64);
}

#[test]
fn eof_is_sticky() {
    let mut lexer = Lexer::new("test.gs", "");
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}

#[test]
fn positions_are_one_based() {
    let tokens = Lexer::tokenize("test.gs", "a\n  bc").unwrap();
    let a = &tokens[0];
    assert_eq!((a.span.start.line, a.span.start.column), (1, 1));
    let bc = &tokens[1];
    assert_eq!((bc.span.start.line, bc.span.start.column), (2, 3));
    assert_eq!((bc.span.end.line, bc.span.end.column), (2, 5));
    assert_eq!(bc.span.byte_range(), 4..6);
}

// ── Error conditions ───────────────────────────────────────────────────

fn lex_error(source: &str) -> DiagnosticKind {
    Lexer::tokenize("test.gs", source)
        .expect_err("lexing should fail")
        .kind
}

#[test]
fn unterminated_string() {
    assert_eq!(lex_error("\"abc"), DiagnosticKind::UnterminatedString);
    assert_eq!(lex_error("\"abc\ndef\""), DiagnosticKind::UnterminatedString);
}

#[test]
fn unterminated_comment() {
    assert_eq!(lex_error("/* abc"), DiagnosticKind::UnterminatedComment);
    assert_eq!(
        lex_error("/* outer /* inner */"),
        DiagnosticKind::UnterminatedComment
    );
}

#[test]
fn illegal_escape() {
    assert_eq!(lex_error(r#""a\n""#), DiagnosticKind::IllegalEscape);
}

#[test]
fn illegal_hex() {
    assert_eq!(lex_error("0x"), DiagnosticKind::IllegalHex);
    assert_eq!(lex_error("0Xzz"), DiagnosticKind::IllegalHex);
}

#[test]
fn number_out_of_range() {
    assert_eq!(
        lex_error("99999999999999999999"),
        DiagnosticKind::NumberOutOfRange
    );
    assert_eq!(
        lex_error("0xFFFFFFFFFFFFFFFFF"),
        DiagnosticKind::NumberOutOfRange
    );
    assert_eq!(lex_error("1e9999"), DiagnosticKind::NumberOutOfRange);
}

#[test]
fn unexpected_character() {
    assert_eq!(lex_error("#"), DiagnosticKind::UnexpectedCharacter);
    assert_eq!(lex_error("/x"), DiagnosticKind::UnexpectedCharacter);
}
