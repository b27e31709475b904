/**
 * Action Scanning Tests
 *
 * Splitting template text at action boundaries
 */

#[cfg(test)]
mod tests {
    use tagforge_compiler::ml_parser::lexer::{
        action_body, is_comment_action, scan_action, split_actions, Cursor, TextPart,
    };
    use tagforge_compiler::parse_util::ParseErrorKind;

    mod split {
        use super::*;

        #[test]
        fn should_split_literal_runs_and_actions() {
            assert_eq!(
                split_actions("a{{.B}}c{{- .D -}}"),
                vec![
                    TextPart::Literal("a"),
                    TextPart::Action("{{.B}}"),
                    TextPart::Literal("c"),
                    TextPart::Action("{{- .D -}}"),
                ]
            );
        }

        #[test]
        fn should_keep_delimiters_inside_strings() {
            assert_eq!(
                split_actions(r#"{{ print "}}" }}x"#),
                vec![TextPart::Action(r#"{{ print "}}" }}"#), TextPart::Literal("x")]
            );
            assert_eq!(
                split_actions("{{ print `}}` }}"),
                vec![TextPart::Action("{{ print `}}` }}")]
            );
        }

        #[test]
        fn should_keep_unterminated_text_literal() {
            assert_eq!(
                split_actions("a{{.B}}c{{ .D"),
                vec![
                    TextPart::Literal("a"),
                    TextPart::Action("{{.B}}"),
                    TextPart::Literal("c{{ .D"),
                ]
            );
        }

        #[test]
        fn should_return_nothing_for_empty_text() {
            assert!(split_actions("").is_empty());
        }
    }

    mod bodies {
        use super::*;

        #[test]
        fn should_strip_delimiters_and_trim_markers() {
            assert_eq!(action_body("{{ .Name }}"), ".Name");
            assert_eq!(action_body("{{- .Name -}}"), ".Name");
            assert_eq!(action_body("{{-3}}"), "-3");
        }

        #[test]
        fn should_detect_comments() {
            assert!(is_comment_action("{{/* note */}}"));
            assert!(is_comment_action("{{- /* note */ -}}"));
            assert!(!is_comment_action("{{ .X }}"));
        }
    }

    mod scanning {
        use super::*;

        #[test]
        fn should_skip_comments_inside_actions() {
            let source = "{{/* }} */}}rest";
            let end = scan_action(Cursor::new(source)).unwrap();
            assert_eq!(end.rest(), "rest");
        }

        #[test]
        fn should_skip_char_literals() {
            let source = "{{ eq .C '}' }}rest";
            let end = scan_action(Cursor::new(source)).unwrap();
            assert_eq!(end.rest(), "rest");
        }

        #[test]
        fn should_reject_unterminated_actions() {
            let err = scan_action(Cursor::new("{{ .X")).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::UnterminatedAction);
            let err = scan_action(Cursor::new(r#"{{ "abc }}"#)).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::UnterminatedAction);
        }

        #[test]
        fn should_reject_nested_open_delimiters() {
            let err = scan_action(Cursor::new("ab{{ {{ }}").advance().advance()).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::NestedActionDelimiter);
            assert_eq!(err.offset(), 5);
        }
    }
}
