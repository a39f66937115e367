mod common;

#[cfg(test)]
mod resolver_tests {
    use pretty_assertions::assert_eq;
    use treelox as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::runner::RunError;
    use lox::scanner::scan_tokens;

    use crate::common::{run_err, run_ok, static_messages};

    /// Resolve `source` directly, returning rendered diagnostics.
    fn resolve(source: &str) -> Vec<String> {
        let (tokens, _) = scan_tokens(source);
        let statements = Parser::new(tokens).parse().expect("source parses");

        let mut interpreter = Interpreter::new();
        match Resolver::new(&mut interpreter).resolve(&statements) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(LoxError::to_string).collect(),
        }
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            resolve("var a = 1; { var a = a; print a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_globals_may_refer_to_themselves() {
        assert!(resolve("var a = 1; var a = a + 1; print a;").is_empty());
    }

    #[test]
    fn test_duplicate_local_declaration() {
        assert_eq!(
            resolve("{ var a = 1; var a = 2; print a; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        assert_eq!(
            resolve("fun f(a, a) { print a; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_unread_locals_are_reported_in_source_order() {
        assert_eq!(
            resolve("{\n  var b = 1;\n  var a = 2;\n  var used = 3;\n  print used;\n}"),
            vec![
                "[line 2] Error at 'b': Local variable is not read.",
                "[line 3] Error at 'a': Local variable is not read.",
            ]
        );
    }

    #[test]
    fn test_unread_parameter() {
        assert_eq!(
            resolve("fun f(unused) { return 1; }\nprint f(0);"),
            vec!["[line 1] Error at 'unused': Local variable is not read."]
        );
    }

    #[test]
    fn test_assignment_alone_does_not_count_as_read() {
        assert_eq!(
            resolve("{ var a; a = 1; }"),
            vec!["[line 1] Error at 'a': Local variable is not read."]
        );
    }

    #[test]
    fn test_read_from_closure_counts() {
        assert!(resolve("{ var a = 1; fun show() { print a; } show(); }").is_empty());
    }

    #[test]
    fn test_return_at_top_level() {
        assert_eq!(
            resolve("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve("class A {\n  init() { return 1; }\n}"),
            vec!["[line 2] Error at 'return': Can't return a value from an initializer."]
        );

        // A bare return is allowed.
        assert!(resolve("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve("print this;\nfun f() { return this; }"),
            vec![
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'this': Can't use 'this' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_methods_need_not_mention_this() {
        assert!(resolve("class A { m() { return 1; } class s() { return 2; } }").is_empty());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let (err, printed) = run_err("return 1;\nprint this;\n{ var x; }");

        assert_eq!(err.exit_code(), 65);
        assert!(matches!(err, RunError::Static(_)));
        assert_eq!(
            static_messages(&err),
            vec![
                "Can't return from top-level code.",
                "Can't use 'this' outside of a class.",
                "Local variable is not read.",
            ]
        );
        assert_eq!(printed, "");
    }

    #[test]
    fn test_closures_bind_at_declaration_site() {
        let output = run_ok(
            r#"
            var a = "global";
            {
              fun showA() {
                print a;
              }

              showA();
              var a = "block";
              showA();
              print a;
            }
            "#,
        );

        assert_eq!(output, "global\nglobal\nblock\n");
    }

    #[test]
    fn test_shadowing_in_nested_blocks() {
        let output = run_ok(
            r#"
            var a = 1;
            {
              var a = 2;
              {
                var a = 3;
                print a;
              }
              print a;
            }
            print a;
            "#,
        );

        assert_eq!(output, "3\n2\n1\n");
    }
}
