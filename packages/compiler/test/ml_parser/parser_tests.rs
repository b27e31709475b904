/**
 * Component Markup Parser Tests
 *
 * Tree building, attribute scanning and structural errors
 */

#[path = "util/mod.rs"]
mod utils;

#[cfg(test)]
mod tests {
    use super::utils::{attr, humanize_nodes, raw_text, row};
    use tagforge_compiler::ml_parser::parser::{parse, ParseTreeResult};
    use tagforge_compiler::parse_util::{ParseError, ParseErrorKind};
    use tagforge_compiler::CompilerConfig;

    const KNOWN: [&str; 5] = ["Card", "Yell", "Outer", "Inner", "Wrapper"];

    fn parse_known(source: &str) -> ParseTreeResult {
        parse(source, &KNOWN, &CompilerConfig::default()).unwrap()
    }

    fn parse_error(source: &str) -> ParseError {
        parse(source, &KNOWN, &CompilerConfig::default()).unwrap_err()
    }

    mod text_nodes {
        use super::*;

        #[test]
        fn should_keep_plain_text_as_one_node() {
            let result = parse_known("Hello {{.Name}}!");
            assert_eq!(humanize_nodes(&result), vec![row("Raw", "Hello {{.Name}}!", 0)]);
        }

        #[test]
        fn should_treat_a_lone_less_than_as_text() {
            let result = parse_known("a < b and 1<2");
            assert_eq!(humanize_nodes(&result), vec![row("Raw", "a < b and 1<2", 0)]);
        }

        #[test]
        fn should_not_see_tags_inside_actions() {
            let result = parse_known(r#"{{ "<Card/>" }}"#);
            assert_eq!(humanize_nodes(&result), vec![row("Raw", r#"{{ "<Card/>" }}"#, 0)]);
        }

        #[test]
        fn should_keep_markup_comments_literal() {
            let result = parse_known("<!-- <Card/> -->x");
            assert_eq!(humanize_nodes(&result), vec![row("Raw", "<!-- <Card/> -->x", 0)]);
        }

        #[test]
        fn should_preserve_source_text_for_literal_markup() {
            let source = r#"<div class="a"><br/><p>x</p></div>"#;
            let result = parse_known(source);
            assert_eq!(raw_text(&result.root_nodes), source);
        }
    }

    mod components {
        use super::*;

        #[test]
        fn should_parse_a_component_inside_literal_markup() {
            let result = parse_known(r#"<b>Hello <Yell Name="Fox"></Yell></b>"#);
            assert_eq!(
                humanize_nodes(&result),
                vec![
                    row("Raw", "<b>", 0),
                    row("Raw", "Hello ", 0),
                    row("Component", "Yell", 0),
                    attr("Name", "Fox"),
                    row("Raw", "</b>", 0),
                ]
            );
        }

        #[test]
        fn should_parse_self_closing_components() {
            let result = parse_known(r#"<Yell Name="Fox"/>"#);
            let yell = result.root_nodes[0].as_component().unwrap();
            assert!(yell.self_closing);
            assert!(!yell.has_children());
        }

        #[test]
        fn should_give_an_empty_pair_no_children() {
            let result = parse_known("<Yell></Yell>");
            let yell = result.root_nodes[0].as_component().unwrap();
            assert!(!yell.self_closing);
            assert!(!yell.has_children());
        }

        #[test]
        fn should_nest_components() {
            let result = parse_known("<Outer><Inner>x</Inner></Outer>");
            assert_eq!(
                humanize_nodes(&result),
                vec![
                    row("Component", "Outer", 0),
                    row("Component", "Inner", 1),
                    row("Raw", "x", 2),
                ]
            );
        }

        #[test]
        fn should_record_component_offsets() {
            let result = parse_known("ab<Card/>");
            assert_eq!(result.root_nodes[1].as_component().unwrap().offset, 2);
        }

        #[test]
        fn should_keep_lowercase_tags_literal() {
            let result = parse_known("<card/>");
            assert_eq!(humanize_nodes(&result), vec![row("Raw", "<card/>", 0)]);
            assert!(result.forward_references.is_empty());
        }

        #[test]
        fn should_swallow_raw_text_elements() {
            let result = parse_known("<script>if (a <Card/>) {}</script>");
            assert_eq!(
                humanize_nodes(&result),
                vec![
                    row("Raw", "<script>if (a <Card/>) {}", 0),
                    row("Raw", "</script>", 0),
                ]
            );
        }
    }

    mod attributes {
        use super::*;

        fn attributes_of(source: &str) -> Vec<Vec<String>> {
            humanize_nodes(&parse_known(source))
                .into_iter()
                .filter(|row| row[0] == "Attr")
                .collect()
        }

        #[test]
        fn should_parse_boolean_attributes() {
            assert_eq!(attributes_of("<Card open/>"), vec![attr("open", "true")]);
            assert_eq!(attributes_of("<Card open>x</Card>"), vec![attr("open", "true")]);
        }

        #[test]
        fn should_parse_both_quote_styles() {
            assert_eq!(
                attributes_of(r#"<Card a="1" b='say "hi"'/>"#),
                vec![attr("a", "1"), attr("b", r#"say "hi""#)]
            );
        }

        #[test]
        fn should_keep_attribute_order() {
            assert_eq!(
                attributes_of(r#"<Card z="1" a="2" m="3"/>"#),
                vec![attr("z", "1"), attr("a", "2"), attr("m", "3")]
            );
        }

        #[test]
        fn should_allow_quotes_inside_actions() {
            assert_eq!(
                attributes_of(r#"<Card title="{{ printf "%s!" .X }}"/>"#),
                vec![attr("title", r#"{{ printf "%s!" .X }}"#)]
            );
        }

        #[test]
        fn should_tolerate_whitespace_around_equals() {
            assert_eq!(attributes_of(r#"<Card title = "x"/>"#), vec![attr("title", "x")]);
        }

        #[test]
        fn should_accept_unquoted_values_on_literal_tags() {
            let result = parse_known("<input value=x disabled>");
            assert_eq!(humanize_nodes(&result), vec![row("Raw", "<input value=x disabled>", 0)]);
        }

        #[test]
        fn should_pass_dynamic_attributes_of_literal_tags_through() {
            let source = r#"<div {{if .X}}class="a"{{end}}>y</div>"#;
            let result = parse_known(source);
            assert_eq!(raw_text(&result.root_nodes), source);
        }
    }

    mod forward_references {
        use super::*;

        #[test]
        fn should_collect_unknown_capitalised_tags_in_order() {
            let result = parse_known("<Soon/><Later>x</Later><Soon></Soon>");
            let names: Vec<&str> = result.forward_references.iter().map(String::as_str).collect();
            assert_eq!(names, vec!["Soon", "Later"]);
            assert_eq!(raw_text(&result.root_nodes), "<Soon/><Later>x</Later><Soon></Soon>");
        }

        #[test]
        fn should_ignore_capitalised_literal_tags() {
            let result = parse_known("<Title>t</Title><DIV>d</DIV>");
            assert!(result.forward_references.is_empty());
        }

        #[test]
        fn should_collect_references_inside_children() {
            let result = parse_known("<Card><Later/></Card>");
            assert!(result.forward_references.contains("Later"));
        }
    }

    mod close_tags {
        use super::*;

        #[test]
        fn should_keep_unrelated_close_tags_as_text() {
            let result = parse_known("<Card><b>x</i></Card>");
            assert_eq!(
                humanize_nodes(&result),
                vec![
                    row("Component", "Card", 0),
                    row("Raw", "<b>", 1),
                    row("Raw", "x", 1),
                    row("Raw", "</i>", 1),
                ]
            );
        }

        #[test]
        fn should_reject_close_tags_of_outer_components() {
            let err = parse_error("<Outer><Inner></Outer></Inner>");
            assert_eq!(
                err.kind,
                ParseErrorKind::MismatchedCloseTag {
                    expected: "Inner".to_string(),
                    found: "Outer".to_string(),
                }
            );
            assert_eq!(err.offset(), 14);
        }

        #[test]
        fn should_keep_stray_close_tags_at_top_level() {
            let result = parse_known("x</Card>");
            assert_eq!(
                humanize_nodes(&result),
                vec![row("Raw", "x", 0), row("Raw", "</Card>", 0)]
            );
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn should_report_unclosed_components() {
            let err = parse_error("ab<Card>text");
            assert_eq!(err.kind, ParseErrorKind::UnclosedComponent { name: "Card".to_string() });
            assert_eq!(err.offset(), 2);
            assert_eq!(err.location.line, 1);
            assert_eq!(err.location.col, 3);
        }

        #[test]
        fn should_report_end_of_input_inside_a_tag() {
            assert!(matches!(
                parse_error(r#"<Card title="x""#).kind,
                ParseErrorKind::UnexpectedEof(_)
            ));
            assert!(matches!(
                parse_error(r#"<Card title="x"#).kind,
                ParseErrorKind::UnexpectedEof(_)
            ));
            assert!(matches!(parse_error("<b>x</b").kind, ParseErrorKind::UnexpectedEof(_)));
        }

        #[test]
        fn should_require_quoted_component_values() {
            assert!(matches!(
                parse_error("<Card title=x/>").kind,
                ParseErrorKind::MalformedAttribute(_)
            ));
        }

        #[test]
        fn should_reject_dynamic_component_attributes() {
            assert_eq!(
                parse_error("<Card {{if .X}}a{{end}}/>").kind,
                ParseErrorKind::DynamicAttributeList("Card".to_string())
            );
        }

        #[test]
        fn should_reject_unterminated_actions_in_attributes() {
            let err = parse_error(r#"<Card title="{{ .X "/>"#);
            assert_eq!(err.kind, ParseErrorKind::UnterminatedAction);
            assert_eq!(err.offset(), 13);
        }

        #[test]
        fn should_reject_nested_action_delimiters() {
            assert_eq!(
                parse_error(r#"<Card title="{{ {{ .X }} }}"/>"#).kind,
                ParseErrorKind::NestedActionDelimiter
            );
        }

        #[test]
        fn should_bound_nesting_depth() {
            let config = CompilerConfig { max_depth: 1 };
            let err = parse("<Card><Card>x</Card></Card>", &KNOWN, &config).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::NestingTooDeep(1));
        }

        #[test]
        fn should_render_context_in_messages() {
            let source = "<Card>text";
            let err = parse_error(source);
            let message = err.contextual_message(source);
            assert!(message.starts_with("unclosed component tag <Card>"));
            assert!(message.contains("[ERROR ->]<Card>text"));
        }
    }
}
