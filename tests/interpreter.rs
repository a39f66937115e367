mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use crate::common::{run_err, run_ok, runtime_message};

    // ───────────────────────── expressions ─────────────────────────

    #[test]
    fn test_arithmetic_and_number_display() {
        let output = run_ok("print 1 + 2 * 3; print 7 / 2; print 10 - 4 - 3; print -(2.5);");

        assert_eq!(output, "7\n3.5\n3\n-2.5\n");
    }

    #[test]
    fn test_string_concatenation_coerces_other_operand() {
        let output = run_ok(r#"print "a" + 1; print 2 + "b"; print "x" + nil; print "s" + "t";"#);

        assert_eq!(output, "a1\n2b\nxnil\nst\n");
    }

    #[test]
    fn test_equality() {
        let output = run_ok(
            r#"
            print nil == nil;
            print 1 == 1;
            print "a" == "a";
            print 1 == "1";
            print nil == false;
            print true != false;
            "#,
        );

        assert_eq!(output, "true\ntrue\ntrue\nfalse\nfalse\ntrue\n");
    }

    #[test]
    fn test_truthiness() {
        let output = run_ok(
            r#"
            print !nil;
            print !false;
            print !0;
            print !"";
            if (0) print "zero is truthy";
            if ("") print "empty is truthy";
            "#,
        );

        assert_eq!(
            output,
            "true\ntrue\nfalse\nfalse\nzero is truthy\nempty is truthy\n"
        );
    }

    #[test]
    fn test_logical_operators_return_an_operand() {
        let output = run_ok(
            r#"
            print nil or "fallback";
            print "first" or "second";
            print nil and "never";
            print 1 and 2;
            "#,
        );

        assert_eq!(output, "fallback\nfirst\nnil\n2\n");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let output = run_ok(
            r#"
            var calls = 0;
            fun bump() { calls = calls + 1; return true; }
            true or bump();
            false and bump();
            print calls;
            "#,
        );

        assert_eq!(output, "0\n");
    }

    #[test]
    fn test_conditional_and_comma() {
        let output = run_ok(
            r#"
            print true ? "yes" : "no";
            print nil ? "yes" : false ? "maybe" : "no";
            var a = 0;
            var b = (a = 1, a + 1);
            print b;
            "#,
        );

        assert_eq!(output, "yes\nno\n2\n");
    }

    #[test]
    fn test_comparison() {
        let output = run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 4 >= 5;");

        assert_eq!(output, "true\ntrue\nfalse\nfalse\n");
    }

    // ───────────────────────── runtime errors ──────────────────────

    #[test]
    fn test_division_by_zero() {
        let (err, _) = run_err("print 1 / 0;");

        assert_eq!(err.exit_code(), 70);
        assert_eq!(err.to_string(), "[line 1] Runtime error: Division by zero.");
    }

    #[test]
    fn test_operand_type_errors() {
        let (err, _) = run_err("print -\"a\";");
        assert_eq!(runtime_message(&err), "Operand must be a number.");

        let (err, _) = run_err("print 1 < \"2\";");
        assert_eq!(runtime_message(&err), "Operands of '<' must be numbers.");

        let (err, _) = run_err("print true + 1;");
        assert_eq!(
            runtime_message(&err),
            "Operands must be two numbers or two strings."
        );
    }

    #[test]
    fn test_undefined_variable() {
        let (err, _) = run_err("print missing;");
        assert_eq!(runtime_message(&err), "Undefined variable 'missing'.");

        let (err, _) = run_err("missing = 1;");
        assert_eq!(runtime_message(&err), "Undefined variable 'missing'.");
    }

    #[test]
    fn test_runtime_error_aborts_rest_of_program() {
        let (err, printed) = run_err("print 1;\nprint nil - 1;\nprint 2;");

        assert_eq!(err.to_string(), "[line 2] Runtime error: Operands of '-' must be numbers.");
        assert_eq!(printed, "1\n");
    }

    // ───────────────────────── statements ──────────────────────────

    #[test]
    fn test_uninitialised_variable_is_nil() {
        assert_eq!(run_ok("var a; print a;"), "nil\n");
    }

    #[test]
    fn test_assignment_is_an_expression() {
        assert_eq!(run_ok("var a; var b; a = b = 3; print a + b;"), "6\n");
    }

    #[test]
    fn test_if_else() {
        let output = run_ok(
            r#"
            if (1 > 2) print "then"; else print "else";
            if (nil) print "skipped";
            "#,
        );

        assert_eq!(output, "else\n");
    }

    #[test]
    fn test_for_and_while_are_equivalent() {
        let with_for = run_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        let with_while = run_ok("{ var i = 0; while (i < 3) { print i; i = i + 1; } }");

        assert_eq!(with_for, "0\n1\n2\n");
        assert_eq!(with_for, with_while);
    }

    #[test]
    fn test_break_leaves_innermost_loop() {
        let output = run_ok(
            r#"
            for (var i = 0; i < 3; i = i + 1) {
              var j = 0;
              while (true) {
                if (j == 2) break;
                j = j + 1;
              }
              print i + j;
            }
            "#,
        );

        assert_eq!(output, "2\n3\n4\n");
    }

    #[test]
    fn test_break_skips_for_increment() {
        let output = run_ok(
            r#"
            var last;
            for (var i = 0; ; i = i + 1) {
              last = i;
              if (i == 4) break;
            }
            print last;
            "#,
        );

        assert_eq!(output, "4\n");
    }

    // ───────────────────────── functions ───────────────────────────

    #[test]
    fn test_recursion() {
        let output = run_ok(
            r#"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
            "#,
        );

        assert_eq!(output, "610\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_closure_counter() {
        let output = run_ok(
            r#"
            fun makeCounter() {
              var count = 0;
              fun increment() {
                count = count + 1;
                return count;
              }
              return increment;
            }

            var first = makeCounter();
            var second = makeCounter();
            print first();
            print first();
            print second();
            "#,
        );

        assert_eq!(output, "1\n2\n1\n");
    }

    #[test]
    fn test_closures_from_one_call_share_its_locals() {
        let output = run_ok(
            r#"
            var inc;
            var get;

            fun makePair() {
              var count = 0;
              fun increment() { count = count + 1; }
              fun read() { return count; }
              inc = increment;
              get = read;
            }

            makePair();
            inc();
            inc();
            print get();
            inc();
            print get();
            "#,
        );

        assert_eq!(output, "2\n3\n");
    }

    #[test]
    fn test_return_unwinds_nested_loops_and_blocks() {
        let output = run_ok(
            r#"
            fun find(limit) {
              for (var i = 0; i < 10; i = i + 1) {
                while (true) {
                  if (i == limit) return i;
                  break;
                }
              }
              return -1;
            }
            print find(3);
            print find(20);
            "#,
        );

        assert_eq!(output, "3\n-1\n");
    }

    #[test]
    fn test_environment_restored_after_error_in_block() {
        let (mut runner, buffer) = crate::common::session();

        assert!(runner.run("var a = \"outer\"; { var a = \"inner\"; print a; nil(); }").is_err());
        runner.run("print a;").unwrap();

        assert_eq!(buffer.contents(), "inner\nouter\n");
    }

    #[test]
    fn test_callable_display() {
        let output = run_ok(
            r#"
            fun greet() {}
            class Box {}
            print greet;
            print clock;
            print Box;
            print Box();
            "#,
        );

        assert_eq!(output, "<fn greet>\n<native fn>\nBox\nBox instance\n");
    }

    #[test]
    fn test_clock_returns_seconds() {
        assert_eq!(run_ok("print clock() > 1000000000;"), "true\n");
    }

    #[test]
    fn test_arity_mismatch() {
        let (err, _) = run_err("fun f(a, b) { return a + b; }\nf(1);");

        assert_eq!(err.to_string(), "[line 2] Runtime error: Expected 2 arguments but got 1.");
    }

    #[test]
    fn test_calling_non_callable() {
        let (err, _) = run_err("\"text\"();");

        assert_eq!(runtime_message(&err), "Can only call functions and classes.");
    }

    #[test]
    fn test_identity_equality_for_functions() {
        let output = run_ok(
            r#"
            fun f() {}
            var g = f;
            fun h() {}
            print f == g;
            print f == h;
            "#,
        );

        assert_eq!(output, "true\nfalse\n");
    }

    // ───────────────────────── classes ─────────────────────────────

    #[test]
    fn test_fields_and_methods() {
        let output = run_ok(
            r#"
            class Point {
              init(x, y) {
                this.x = x;
                this.y = y;
              }

              sum() {
                return this.x + this.y;
              }
            }

            var p = Point(2, 3);
            print p.sum();
            p.x = 10;
            print p.sum();
            "#,
        );

        assert_eq!(output, "5\n13\n");
    }

    #[test]
    fn test_initializer_returns_instance() {
        let output = run_ok(
            r#"
            class Thing {
              init() {
                this.n = 1;
                return;
              }
            }

            var t = Thing();
            var again = t.init();
            print again == t;
            print again.n;
            "#,
        );

        assert_eq!(output, "true\n1\n");
    }

    #[test]
    fn test_bound_method_keeps_receiver() {
        let output = run_ok(
            r#"
            class Person {
              init(name) { this.name = name; }
              hello() { return "hi " + this.name; }
            }

            var method = Person("ada").hello;
            print method();
            "#,
        );

        assert_eq!(output, "hi ada\n");
    }

    #[test]
    fn test_getter_runs_on_access() {
        let output = run_ok(
            r#"
            class Circle {
              init(radius) { this.radius = radius; }
              area { return 3 * this.radius * this.radius; }
            }

            print Circle(2).area;
            "#,
        );

        assert_eq!(output, "12\n");
    }

    #[test]
    fn test_static_methods() {
        let output = run_ok(
            r#"
            class Math {
              class square(n) { return n * n; }
              class self() { return this; }
            }

            print Math.square(4);
            print Math.self() == Math;
            "#,
        );

        assert_eq!(output, "16\ntrue\n");
    }

    #[test]
    fn test_static_method_is_not_an_instance_method() {
        let (err, _) = run_err("class A { class make() { return A(); } }\nA().make();");

        assert_eq!(err.to_string(), "[line 2] Runtime error: Undefined property 'make'.");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let output = run_ok(
            r#"
            class A {
              m() { return "method"; }
            }

            var a = A();
            print a.m();
            a.m = "field";
            print a.m;
            "#,
        );

        assert_eq!(output, "method\nfield\n");
    }

    #[test]
    fn test_class_values_hold_fields() {
        let output = run_ok(
            r#"
            class Config {}
            Config.level = 3;
            print Config.level;
            "#,
        );

        assert_eq!(output, "3\n");
    }

    #[test]
    fn test_property_errors() {
        let (err, _) = run_err("class A {}\nprint A().nope;");
        assert_eq!(runtime_message(&err), "Undefined property 'nope'.");

        let (err, _) = run_err("var n = 1;\nprint n.field;");
        assert_eq!(runtime_message(&err), "Only instances have properties.");

        let (err, _) = run_err("var s = \"str\";\ns.field = 1;");
        assert_eq!(runtime_message(&err), "Only instances have fields.");
    }

    #[test]
    fn test_constructor_arity_follows_init() {
        let (err, _) = run_err("class A { init(a) { print a; } }\nA();");
        assert_eq!(runtime_message(&err), "Expected 1 arguments but got 0.");

        let (err, _) = run_err("class B {}\nB(1);");
        assert_eq!(runtime_message(&err), "Expected 0 arguments but got 1.");
    }
}
