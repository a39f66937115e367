mod common;

#[cfg(test)]
mod runner_tests {
    use pretty_assertions::assert_eq;
    use treelox as lox;

    use lox::runner::{RunError, Runner};
    use lox::value::Value;

    use crate::common::{run_err, session, static_messages};

    #[test]
    fn test_static_errors_prevent_execution() {
        let (err, printed) = run_err("print \"before\";\nprint (1;\nprint \"after\";");

        assert_eq!(printed, "");
        assert_eq!(err.exit_code(), 65);
        assert_eq!(
            err.to_string(),
            "[line 2] Error at ';': Expect ')' after expression."
        );
    }

    #[test]
    fn test_lex_and_parse_errors_reported_together() {
        let (err, printed) = run_err("print 1 $;\nvar = 2;");

        assert_eq!(printed, "");
        assert_eq!(
            static_messages(&err),
            vec!["Unexpected character.", "Expect variable name."]
        );
        assert_eq!(
            err.to_string(),
            "[line 1] Error: Unexpected character.\n[line 2] Error at '=': Expect variable name."
        );
    }

    #[test]
    fn test_lex_error_alone_still_fails_closed() {
        let (err, printed) = run_err("print 1;\n#");

        assert_eq!(printed, "");
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_resolve_errors_prevent_execution() {
        let (err, printed) = run_err("print 1;\n{ var unused = 2; }");

        assert_eq!(printed, "");
        assert_eq!(
            err.to_string(),
            "[line 2] Error at 'unused': Local variable is not read."
        );
    }

    #[test]
    fn test_runtime_error_exit_code() {
        let (err, _) = run_err("nil();");

        assert!(matches!(err, RunError::Runtime(_)));
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_repl_persists_globals_between_lines() {
        let (mut runner, buffer) = session();

        assert!(runner.run_line("var x = 40;").unwrap().is_none());
        assert!(runner.run_line("fun add(n) { return x + n; }").unwrap().is_none());
        assert_eq!(runner.run_line("add(2)").unwrap(), Some(Value::Number(42.0)));

        runner.run_line("print x;").unwrap();
        assert_eq!(buffer.contents(), "40\n");
    }

    #[test]
    fn test_repl_survives_errors() {
        let (mut runner, buffer) = session();

        runner.run_line("var count = 1;").unwrap();

        let err = runner.run_line("count = count + nil;").unwrap_err();
        assert_eq!(err.exit_code(), 70);

        let err = runner.run_line("print (;").unwrap_err();
        assert_eq!(err.exit_code(), 65);

        runner.run_line("count = count + 1;").unwrap();
        runner.run_line("print count;").unwrap();
        assert_eq!(buffer.contents(), "2\n");
    }

    #[test]
    fn test_repl_closures_resolve_across_lines() {
        let (mut runner, _) = session();

        runner
            .run_line("fun counter() { var n = 0; fun next() { n = n + 1; return n; } return next; }")
            .unwrap();
        runner.run_line("var tick = counter();").unwrap();
        runner.run_line("tick();").unwrap();

        assert_eq!(runner.run_line("tick()").unwrap(), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_deep_recursion_completes_and_session_continues() {
        let (mut runner, buffer) = session();

        runner
            .run("fun count(n) { if (n > 0) return count(n - 1); return 0; }\nprint count(10000);")
            .unwrap();
        runner.run_line("print \"still here\";").unwrap();

        assert_eq!(buffer.contents(), "0\nstill here\n");
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let (mut runner, buffer) = session();

        runner.run_line("fun forever(n) { return forever(n + 1); }").unwrap();

        let err = runner.run_line("forever(0);").unwrap_err();
        assert_eq!(err.exit_code(), 70);
        assert_eq!(
            err.to_string(),
            "[line 1] Runtime error: Stack overflow."
        );

        // Call depth unwinds with the error, so ordinary calls work again.
        runner.run_line("fun one() { return 1; }").unwrap();
        assert_eq!(runner.run_line("one()").unwrap(), Some(Value::Number(1.0)));
        runner.run_line("print \"recovered\";").unwrap();
        assert_eq!(buffer.contents(), "recovered\n");
    }

    #[test]
    fn test_deeply_nested_expression() {
        let depth = 2000;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let mut runner = Runner::new();

        assert_eq!(runner.evaluate(&source).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_evaluate_single_expression() {
        let mut runner = Runner::new();

        assert_eq!(
            runner.evaluate("(1 + 2) * 4 == 12").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            runner.evaluate("\"con\" + \"cat\"").unwrap(),
            Value::String("concat".to_string())
        );
    }

    #[test]
    fn test_evaluate_errors() {
        let mut runner = Runner::new();

        let err = runner.evaluate("1 +").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Error at end: Expect expression.");
        assert_eq!(err.exit_code(), 65);

        let err = runner.evaluate("-\"x\"").unwrap_err();
        assert_eq!(err.to_string(), "[line 1] Runtime error: Operand must be a number.");
        assert_eq!(err.exit_code(), 70);
    }

    #[test]
    fn test_interpreter_exposes_natives_in_globals() {
        let runner = Runner::new();
        let clock = runner.interpreter().globals().borrow().get_own("clock");

        assert!(matches!(clock, Some(Value::Callable(_))));
    }
}
