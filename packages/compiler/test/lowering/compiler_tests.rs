/**
 * Lowering Tests
 *
 * Template source in, host source out
 */

#[cfg(test)]
mod tests {
    use tagforge_compiler::{compile, CompiledTemplate, CompilerConfig};

    const KNOWN: [&str; 4] = ["Yell", "Wrapper", "Row", "Panel"];

    fn compile_known(source: &str) -> CompiledTemplate {
        compile(source, &KNOWN, &CompilerConfig::default()).unwrap()
    }

    mod passthrough {
        use super::*;

        #[test]
        fn should_leave_templates_without_components_unchanged() {
            for source in [
                "",
                "plain",
                "<p class=\"x\">{{.Name}}</p>",
                "{{range $i, $v := .Items}}{{$i}}={{$v}}{{end}}",
                "<script>let a = 1 < 2;</script>",
                "<Later>forward</Later>",
            ] {
                assert_eq!(compile_known(source).source, source);
            }
        }
    }

    mod call_outs {
        use super::*;

        #[test]
        fn should_lower_a_component_inside_markup() {
            let compiled = compile_known(r#"<b>Hello <Yell Name="Fox"></Yell></b>"#);
            assert_eq!(
                compiled.source,
                r#"<b>Hello {{__tfRenderComponent "Yell" "" (__tfDict "Name" "Fox") nil}}</b>"#
            );
            assert!(compiled.blocks.is_empty());
        }

        #[test]
        fn should_lower_self_closing_and_empty_pairs_alike() {
            assert_eq!(compile_known("<Yell/>").source, compile_known("<Yell></Yell>").source);
        }

        #[test]
        fn should_splice_expression_attributes() {
            let compiled = compile_known(r#"<Yell Name="{{ .User.Name }}" Greeting="Hi {{.First}}"/>"#);
            assert_eq!(
                compiled.source,
                concat!(
                    r#"{{__tfRenderComponent "Yell" "" (__tfDict "Name" (.User.Name) "#,
                    r#""Greeting" (__tfConcat "Hi " (.First))) nil}}"#
                )
            );
        }

        #[test]
        fn should_escape_quotes_in_literal_attributes() {
            let compiled = compile_known(r#"<Yell Name='say "hi"'/>"#);
            assert_eq!(
                compiled.source,
                r#"{{__tfRenderComponent "Yell" "" (__tfDict "Name" "say \"hi\"") nil}}"#
            );
        }
    }

    mod blocks {
        use super::*;

        #[test]
        fn should_hoist_children_into_a_block() {
            let compiled = compile_known("<Wrapper>Hi</Wrapper>");
            assert_eq!(
                compiled.source,
                concat!(
                    r#"{{__tfRenderComponent "Wrapper" "tf__Wrapper__0" nil "#,
                    r#"(__tfDict "tf__dot__" . "tf__root__" $ "tf__locals__" (__tfDict))}}"#,
                    r#"{{define "tf__Wrapper__0"}}Hi{{end}}"#
                )
            );
            assert_eq!(compiled.blocks, vec!["tf__Wrapper__0"]);
        }

        #[test]
        fn should_capture_loop_variables() {
            let compiled =
                compile_known("{{range $i, $row := .Rows}}<Row>{{$i}}: {{$row.Name}} of {{$.Title}}</Row>{{end}}");
            assert_eq!(
                compiled.source,
                concat!(
                    r#"{{range $i, $row := .Rows}}{{__tfRenderComponent "Row" "tf__Row__0" nil "#,
                    r#"(__tfDict "tf__dot__" . "tf__root__" $ "tf__locals__" (__tfDict "i" $i "row" $row))}}{{end}}"#,
                    r#"{{define "tf__Row__0"}}{{$.tf__locals__.i}}: {{$.tf__locals__.row.Name}} of {{$.tf__root__.Title}}{{end}}"#
                )
            );
        }

        #[test]
        fn should_keep_variables_declared_inside_children() {
            let compiled = compile_known("<Wrapper>{{range $x := .Items}}{{$x}}{{.}}{{end}}</Wrapper>");
            assert!(compiled.source.contains(
                r#"{{define "tf__Wrapper__0"}}{{range $x := $.tf__dot__.Items}}{{$x}}{{.}}{{end}}{{end}}"#
            ));
            assert!(compiled.source.contains(r#""tf__locals__" (__tfDict))"#));
        }

        #[test]
        fn should_number_blocks_in_document_order() {
            let compiled = compile_known("<Wrapper>a</Wrapper><Panel><Wrapper>b</Wrapper></Panel>");
            assert_eq!(
                compiled.blocks,
                vec!["tf__Wrapper__0", "tf__Wrapper__2", "tf__Panel__1"]
            );
        }

        #[test]
        fn should_build_a_fresh_carrier_inside_a_range() {
            let compiled = compile_known(
                "<Panel>{{range $item := .Items}}<Row>{{$item}}</Row>{{end}}</Panel>",
            );
            assert!(compiled.source.contains(concat!(
                r#"{{range $item := $.tf__dot__.Items}}{{__tfRenderComponent "Row" "tf__Row__1" nil "#,
                r#"(__tfDict "tf__dot__" . "tf__root__" $.tf__root__ "tf__locals__" (__tfDict "item" $item))}}{{end}}"#
            )));
        }

        #[test]
        fn should_pass_the_block_carrier_to_nested_components() {
            let compiled = compile_known("<Panel><Row>{{$name}}</Row></Panel>");
            assert_eq!(
                compiled.source,
                concat!(
                    r#"{{__tfRenderComponent "Panel" "tf__Panel__0" nil "#,
                    r#"(__tfDict "tf__dot__" . "tf__root__" $ "tf__locals__" (__tfDict "name" $name))}}"#,
                    r#"{{define "tf__Row__1"}}{{$.tf__locals__.name}}{{end}}"#,
                    r#"{{define "tf__Panel__0"}}{{__tfRenderComponent "Row" "tf__Row__1" nil $}}{{end}}"#
                )
            );
        }
    }

    mod forward_references {
        use super::*;

        #[test]
        fn should_report_unknown_components() {
            let compiled = compile_known("<Wrapper><Later/></Wrapper>");
            assert!(compiled.has_forward_references());
            assert!(compiled.source.contains(r#"{{define "tf__Wrapper__0"}}<Later/>{{end}}"#));
        }
    }
}
