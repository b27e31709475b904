/**
 * Scope Rewriting Tests
 *
 * References inside hoisted content go through the context carrier
 */

#[cfg(test)]
mod tests {
    use tagforge_compiler::ScopeRewriter;

    fn rewrite(text: &str) -> String {
        ScopeRewriter::new().rewrite_text(text)
    }

    mod references {
        use super::*;

        #[test]
        fn should_rewrite_every_reference_kind() {
            assert_eq!(
                rewrite("{{$x}} {{$}} {{.}} {{.A.B}}"),
                "{{$.tf__locals__.x}} {{$.tf__root__}} {{$.tf__dot__}} {{$.tf__dot__.A.B}}"
            );
        }

        #[test]
        fn should_rewrite_references_inside_pipelines() {
            assert_eq!(
                rewrite("{{printf \"%s-%d\" .Name $n | html}}"),
                "{{printf \"%s-%d\" $.tf__dot__.Name $.tf__locals__.n | html}}"
            );
            assert_eq!(
                rewrite("{{if and .A (eq $x 1)}}y{{end}}"),
                "{{if and $.tf__dot__.A (eq $.tf__locals__.x 1)}}y{{end}}"
            );
        }

        #[test]
        fn should_leave_literals_and_comments_alone() {
            assert_eq!(rewrite(r#"{{"$x ."}}"#), r#"{{"$x ."}}"#);
            assert_eq!(rewrite(r#"{{"\"$x"}}"#), r#"{{"\"$x"}}"#);
            assert_eq!(rewrite("{{`$ .`}}"), "{{`$ .`}}");
            assert_eq!(rewrite("{{'.'}}"), "{{'.'}}");
            assert_eq!(rewrite("{{/* $x */}}"), "{{/* $x */}}");
        }

        #[test]
        fn should_leave_text_outside_actions_alone() {
            let text = "Cost: $5. See .Name and {x} $ .";
            assert_eq!(rewrite(text), text);
        }

        #[test]
        fn should_not_rewrite_twice() {
            let once = rewrite("{{$x.A}} {{$}} {{.}} {{.B}} {{$.C}}");
            assert_eq!(rewrite(&once), once);
        }
    }

    mod control_structure {
        use super::*;

        #[test]
        fn should_keep_range_variables_local() {
            assert_eq!(
                rewrite("{{range $k, $v := .M}}{{$k}}{{$v}}{{$other}}{{end}}{{$k}}"),
                "{{range $k, $v := $.tf__dot__.M}}{{$k}}{{$v}}{{$.tf__locals__.other}}{{end}}{{$.tf__locals__.k}}"
            );
        }

        #[test]
        fn should_not_rewrite_dot_inside_with() {
            assert_eq!(
                rewrite("{{with .User}}{{.Name}}{{end}}{{.Name}}"),
                "{{with $.tf__dot__.User}}{{.Name}}{{end}}{{$.tf__dot__.Name}}"
            );
        }

        #[test]
        fn should_rewrite_dot_in_range_else() {
            assert_eq!(
                rewrite("{{range .Items}}{{.}}{{else}}{{.Empty}}{{end}}"),
                "{{range $.tf__dot__.Items}}{{.}}{{else}}{{$.tf__dot__.Empty}}{{end}}"
            );
        }

        #[test]
        fn should_treat_assignment_as_a_reference() {
            let mut rewriter = ScopeRewriter::new();
            assert_eq!(rewriter.rewrite_text("{{$x = 1}}"), "{{$x = 1}}");
            assert!(rewriter.captured().is_empty());
            assert_eq!(rewriter.rewrite_text("{{$x}}"), "{{$.tf__locals__.x}}");
        }

        #[test]
        fn should_scope_declarations_to_their_block() {
            assert_eq!(
                rewrite("{{if .Ok}}{{$y := 2}}{{$y}}{{end}}{{$y}}"),
                "{{if $.tf__dot__.Ok}}{{$y := 2}}{{$y}}{{end}}{{$.tf__locals__.y}}"
            );
        }

        #[test]
        fn should_keep_pipeline_variables_in_the_else_branch() {
            let mut rewriter = ScopeRewriter::new();
            assert_eq!(
                rewriter.rewrite_text("{{if $x := .A}}{{$x}}{{else}}{{$x}}{{end}}"),
                "{{if $x := $.tf__dot__.A}}{{$x}}{{else}}{{$x}}{{end}}"
            );
            assert!(rewriter.captured().is_empty());
        }

        #[test]
        fn should_extend_declarations_in_chained_branches() {
            let mut rewriter = ScopeRewriter::new();
            assert_eq!(
                rewriter.rewrite_text("{{with $a := .A}}{{$a}}{{else with $b := .B}}{{$a}}{{$b}}{{end}}{{$a}}"),
                "{{with $a := $.tf__dot__.A}}{{$a}}{{else with $b := $.tf__dot__.B}}{{$a}}{{$b}}{{end}}{{$.tf__locals__.a}}"
            );
            let captured: Vec<&str> = rewriter.captured().iter().map(String::as_str).collect();
            assert_eq!(captured, vec!["a"]);
        }
    }

    mod captures {
        use super::*;

        #[test]
        fn should_capture_in_order_of_first_use() {
            let mut rewriter = ScopeRewriter::new();
            rewriter.rewrite_text("{{$b}}{{$a}}{{$b}}");
            let captured: Vec<&str> = rewriter.captured().iter().map(String::as_str).collect();
            assert_eq!(captured, vec!["b", "a"]);
        }

        #[test]
        fn should_rewrite_attribute_pipelines() {
            let mut rewriter = ScopeRewriter::new();
            assert_eq!(rewriter.rewrite_pipeline(".Title"), "$.tf__dot__.Title");
            assert_eq!(rewriter.rewrite_pipeline("$row.Id"), "$.tf__locals__.row.Id");
            assert!(rewriter.captured().contains("row"));
        }
    }
}
