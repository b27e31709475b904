/**
 * Registration Tests
 *
 * Naming rules, compile errors and forward references between templates
 */

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use tagforge::{Component, Engine, Error, ParseErrorKind};

    macro_rules! component {
        ($($name:ident),*) => {
            $(
                #[derive(Debug, Default, Serialize, Deserialize)]
                #[serde(rename_all = "PascalCase")]
                struct $name {
                    deep: bool,
                }
                impl Component for $name {}
            )*
        };
    }

    component!(Shell, Card, Icon, Left, Right, Base, Ping, Pong, Later);

    mod naming {
        use super::*;

        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Button {}
        impl Component for Button {}

        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Lower {}
        impl Component for Lower {
            fn component_name() -> &'static str {
                "lower"
            }
        }

        #[derive(Debug, Default, Serialize, Deserialize)]
        struct Dashed {}
        impl Component for Dashed {
            fn component_name() -> &'static str {
                "Nav-Bar"
            }
        }

        #[test]
        fn should_reject_markup_tag_names() {
            let err = Engine::default().register_component::<Button>("<b/>").unwrap_err();
            assert!(matches!(err, Error::Naming { ref name, .. } if name == "Button"));
        }

        #[test]
        fn should_reject_names_that_are_not_tags() {
            let mut engine = Engine::default();
            assert!(matches!(engine.register_component::<Lower>("x"), Err(Error::Naming { .. })));
            assert!(matches!(engine.register_component::<Dashed>("x"), Err(Error::Naming { .. })));
            assert!(engine.known_components().is_empty());
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn should_report_malformed_markup() {
            let mut engine = Engine::default();
            engine.register_component::<Card>("card").unwrap();
            let err = engine.register_component::<Shell>("<div><Card>open</div>").unwrap_err();
            match err {
                Error::Parse { template, source } => {
                    assert_eq!(template, "Shell");
                    assert!(matches!(source.kind, ParseErrorKind::UnclosedComponent { .. }));
                }
                other => panic!("expected a parse error, got {other}"),
            }
            assert_eq!(engine.known_components(), vec!["Card"]);
        }

        #[test]
        fn should_report_template_errors() {
            let err = Engine::default()
                .register_component::<Shell>("{{if .Deep}}unterminated")
                .unwrap_err();
            assert!(matches!(err, Error::Compile { ref template, .. } if template == "Shell"));
        }

        #[test]
        fn should_leave_the_engine_unchanged_when_recompiling_fails() {
            let mut engine = Engine::default();
            engine.register_component::<Shell>("<div><Later>open</div>").unwrap();
            let before = engine.render_to_string(&Shell::default()).unwrap();
            assert_eq!(before, "<div><Later>open</div>");

            let err = engine.register_component::<Later>("later").unwrap_err();
            match &err {
                Error::Recompile { template, source } => {
                    assert_eq!(template, "Shell");
                    assert!(matches!(**source, Error::Parse { .. }));
                }
                other => panic!("expected a recompile error, got {other}"),
            }
            assert_eq!(engine.known_components(), vec!["Shell"]);
            assert_eq!(engine.pending_references(), vec![("Later", vec!["Shell"])]);
            assert_eq!(engine.render_to_string(&Shell::default()).unwrap(), before);
        }
    }

    mod forward_references {
        use super::*;

        const SHELL: &str = "<main><Card/>|<Icon/></main>";

        fn render_shell(engine: &mut Engine) -> String {
            engine.render_to_string(&Shell::default()).unwrap()
        }

        #[test]
        fn should_render_the_same_in_any_registration_order() {
            let mut first = Engine::default();
            first.register_component::<Card>("card").unwrap();
            first.register_component::<Icon>("icon").unwrap();
            first.register_component::<Shell>(SHELL).unwrap();

            let mut last = Engine::default();
            last.register_component::<Shell>(SHELL).unwrap();
            last.register_component::<Icon>("icon").unwrap();
            last.register_component::<Card>("card").unwrap();

            assert_eq!(render_shell(&mut first), "<main>card|icon</main>");
            assert_eq!(render_shell(&mut first), render_shell(&mut last));
            assert_eq!(first.compiled_source("Shell"), last.compiled_source("Shell"));
        }

        #[test]
        fn should_track_pending_references() {
            let mut engine = Engine::default();
            engine.register_component::<Shell>(SHELL).unwrap();
            assert_eq!(render_shell(&mut engine), SHELL);
            assert_eq!(
                engine.pending_references(),
                vec![("Card", vec!["Shell"]), ("Icon", vec!["Shell"])]
            );

            engine.register_component::<Card>("card").unwrap();
            assert_eq!(engine.pending_references(), vec![("Icon", vec!["Shell"])]);
            assert_eq!(engine.forward_references("Shell"), vec!["Icon"]);
            assert_eq!(render_shell(&mut engine), "<main>card|<Icon/></main>");

            engine.register_component::<Icon>("icon").unwrap();
            assert!(engine.pending_references().is_empty());
            assert!(engine.forward_references("Shell").is_empty());
        }

        #[test]
        fn should_recompile_diamond_dependencies() {
            let mut engine = Engine::default();
            engine.register_component::<Shell>("<Left/>+<Right/>").unwrap();
            engine.register_component::<Left>("L(<Base/>)").unwrap();
            engine.register_component::<Right>("R(<Base/>)").unwrap();
            assert_eq!(engine.pending_references(), vec![("Base", vec!["Left", "Right"])]);

            engine.register_component::<Base>("base").unwrap();
            assert!(engine.pending_references().is_empty());
            assert_eq!(render_shell(&mut engine), "L(base)+R(base)");
        }

        #[test]
        fn should_terminate_on_cycles() {
            let mut engine = Engine::default();
            engine.register_component::<Ping>("ping{{if .Deep}}<Pong/>{{end}}").unwrap();
            engine.register_component::<Pong>("-pong-<Ping/>").unwrap();
            assert!(engine.pending_references().is_empty());
            assert!(engine.compiled_source("Ping").is_some_and(|source| source.contains("\"Pong\"")));

            let output = engine.render_to_string(&Ping { deep: true }).unwrap();
            assert_eq!(output, "ping-pong-ping");
        }

        #[test]
        fn should_replace_a_registered_template() {
            let mut engine = Engine::default();
            engine.register_component::<Card>("old").unwrap();
            engine.register_component::<Shell>("[<Card/>]").unwrap();
            engine.register_component::<Card>("new").unwrap();
            assert_eq!(render_shell(&mut engine), "[new]");
            assert_eq!(engine.known_components(), vec!["Card", "Shell"]);
        }
    }
}
