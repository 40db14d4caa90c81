#[cfg(test)]
mod scanner_tests {
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / -",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::MINUS, "-"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class Pie < Dessert { init() { this.x = super.y; } } classy _a1",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Pie"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Dessert"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::IDENTIFIER, "_a1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_are_skipped() {
        assert_token_sequence(
            "print 1; // print 2;\nprint 3;",
            &[
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER(0.0), "3"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_literals() {
        let tokens: Vec<Token> = Scanner::new("123 45.5 \"hi there\" 7.")
            .filter_map(Result::ok)
            .collect();

        let printed: Vec<String> = tokens.iter().map(Token::to_string).collect();

        assert_eq!(
            printed,
            vec![
                "NUMBER 123 123.0",
                "NUMBER 45.5 45.5",
                "STRING \"hi there\" hi there",
                "NUMBER 7 7.0",
                "DOT . null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_06_line_numbers() {
        let tokens: Vec<Token> = Scanner::new("a\n\"multi\nline\"\nb")
            .filter_map(Result::ok)
            .collect();

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 4]);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = tokenize("print \"oops");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unterminated string.");
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );

        // Helper function
        fn assert_token_matches(
            result: &rox::Result<Token>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_non_ascii_character_is_one_error() {
        let (tokens, errors) = tokenize("é");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: é");
        assert_eq!(tokens.len(), 1);
    }
}
