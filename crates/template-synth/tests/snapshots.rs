//! End-to-end template tests.
//!
//! Each test builds the IR a front end would hand over for a small closure
//! and checks the emitted template. Run `cargo insta review` to update the
//! inline snapshots after intentional changes.

#![cfg(all(feature = "appsync", feature = "apigateway"))]

use std::sync::Arc;
use template_synth::dialect::apigateway::to_json;
use template_synth::{
    ApiGateway, ApiGatewayConfig, Appsync, AppsyncConfig, AppsyncOutput, BinaryOp, DeclKind,
    Direction, ErrorCode, Integration, IntegrationCall, IntegrationMapping, IrBuilder, NULL,
    Node, NodeId, Synth, SynthConfig, SynthError, UnaryOp,
};

fn lines(text: &[&str]) -> String {
    text.join("\n")
}

/// Build `(input, ctx) => { ...statements }` and compile it as a resolver.
fn resolver(
    config: &AppsyncConfig,
    build: impl FnOnce(&mut IrBuilder) -> Vec<NodeId>,
) -> Result<AppsyncOutput, SynthError> {
    let mut b = IrBuilder::new();
    let input = b.param("input");
    let ctx = b.param("ctx");
    let statements = build(&mut b);
    let body = b.block(statements);
    let root = b.function(vec![input, ctx], body);
    let ir = b.finish().unwrap();
    Appsync::compile(&ir, root, config)
}

/// Build `(input) => expr` and compile it as a resolver.
fn resolver_expr(build: impl FnOnce(&mut IrBuilder) -> NodeId) -> Result<AppsyncOutput, SynthError> {
    let mut b = IrBuilder::new();
    let input = b.param("input");
    let body = build(&mut b);
    let root = b.function(vec![input], body);
    let ir = b.finish().unwrap();
    Appsync::compile(&ir, root, &AppsyncConfig::default())
}

/// A data source call rendered as a request stored in the stash.
#[derive(Debug)]
struct Invoke(&'static str);

impl Integration for Invoke {
    fn kind(&self) -> &str {
        self.0
    }

    fn appsync(
        &self,
        call: &IntegrationCall,
        cx: &mut Synth<'_, Appsync>,
    ) -> Result<String, SynthError> {
        let payload = match call.arg(0) {
            Some(arg) => cx.render_argument(arg)?,
            None => NULL.to_string(),
        };
        cx.emit(format!(
            "#set($context.stash.request = {{\"function\": \"{}\", \"payload\": {payload}}})",
            self.0
        ));
        Ok("$context.prev.result".to_string())
    }

    fn apigateway(
        &self,
        call: &IntegrationCall,
        cx: &mut Synth<'_, ApiGateway>,
    ) -> Result<String, SynthError> {
        let payload = match call.arg(0) {
            Some(arg) => to_json(cx, arg)?,
            None => "null".to_string(),
        };
        Ok(format!("{{\"function\":\"{}\",\"payload\":{payload}}}", self.0))
    }
}

/// An integration that only knows one dialect.
#[derive(Debug)]
struct ResolverOnly;

impl Integration for ResolverOnly {
    fn kind(&self) -> &str {
        "resolver.only"
    }
}

// ============================================================================
// Literals and returns
// ============================================================================

mod literals {
    use super::*;

    fn returned(build: impl FnOnce(&mut IrBuilder) -> NodeId) -> String {
        resolver(&AppsyncConfig::default(), |b| {
            let value = build(b);
            vec![b.return_stmt(Some(value))]
        })
        .unwrap()
        .template
    }

    #[test]
    fn null_and_undefined() {
        assert_eq!(returned(|b| b.null()), "#return($null)");
        assert_eq!(returned(|b| b.undefined()), "#return($null)");
    }

    #[test]
    fn booleans() {
        assert_eq!(returned(|b| b.boolean(true)), "#return(true)");
        assert_eq!(returned(|b| b.boolean(false)), "#return(false)");
    }

    #[test]
    fn numbers() {
        assert_eq!(returned(|b| b.number(1.0)), "#return(1)");
        assert_eq!(returned(|b| b.number(0.5)), "#return(0.5)");
    }

    #[test]
    fn strings() {
        assert_eq!(returned(|b| b.string("hello")), "#return(\"hello\")");
    }

    #[test]
    fn strings_with_template_syntax_stay_literal() {
        assert_eq!(
            returned(|b| b.string("cost: $price #if(true)x#end")),
            "#return('cost: $price #if(true)x#end')"
        );
        assert_eq!(returned(|b| b.string("it's $5")), "#return('it''s $5')");
    }

    #[test]
    fn template_text_is_not_evaluated() {
        let template = returned(|b| {
            let input = b.ident("input");
            let total = b.prop(input, "total");
            b.template("total: $", vec![(total, "")])
        });
        assert_eq!(
            template,
            lines(&[
                "#set($v1 = 'total: $')",
                "#return(\"${v1}${context.arguments.total}\")",
            ])
        );
    }

    #[test]
    fn non_finite_numbers_are_unsupported() {
        let err = resolver_expr(|b| b.number(f64::NAN)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
        let err = resolver_expr(|b| b.number(f64::INFINITY)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
    }

    #[test]
    fn parameter_roots() {
        assert_eq!(returned(|b| b.ident("input")), "#return($context.arguments)");
        assert_eq!(returned(|b| b.ident("ctx")), "#return($context)");
    }

    #[test]
    fn output_serializes() {
        let out = resolver_expr(|b| b.ident("input")).unwrap();
        insta::assert_json_snapshot!(out, @r###"
        {
          "template": "#return($context.arguments)",
          "integrations": []
        }
        "###);
    }
}

// ============================================================================
// Expressions that need statements
// ============================================================================

mod expressions {
    use super::*;

    #[test]
    fn object_spread_keeps_source_order() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let one = b.number(1.0);
            let a = b.property("a", one);
            let input = b.ident("input");
            let spread = b.spread_property(input);
            let two = b.number(2.0);
            let c = b.property("c", two);
            let object = b.object(vec![a, spread, c]);
            vec![b.return_stmt(Some(object))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = {})",
                "$util.qr($v1.put(\"a\", 1))",
                "$util.qr($v1.putAll($context.arguments))",
                "$util.qr($v1.put(\"c\", 2))",
                "#return($v1)",
            ])
        );
    }

    #[test]
    fn push_becomes_add() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let empty = b.array(vec![]);
            let decl = b.const_decl("list", empty);
            let list = b.ident("list");
            let x = b.string("x");
            let push = b.method(list, "push", vec![x]);
            let stmt = b.expr_stmt(push);
            let result = b.ident("list");
            vec![decl, stmt, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.list = [])",
                "$util.qr($context.stash.list.add(\"x\"))",
                "#return($context.stash.list)",
            ])
        );
        assert_eq!(out.template.matches(".add(").count(), 1);
    }

    #[test]
    fn push_with_several_arguments_is_unsupported() {
        let err = resolver(&AppsyncConfig::default(), |b| {
            let list = b.ident("input");
            let x = b.number(1.0);
            let y = b.number(2.0);
            let push = b.method(list, "push", vec![x, y]);
            vec![b.expr_stmt(push)]
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
        assert!(err.to_string().contains("`push` with 2 arguments"));
    }

    #[test]
    fn conditional_materializes() {
        let out = resolver_expr(|b| {
            let input = b.ident("input");
            let flag = b.prop(input, "flag");
            let yes = b.string("a");
            let no = b.string("b");
            b.conditional(flag, yes, no)
        })
        .unwrap();
        insta::assert_snapshot!(out.template, @r###"
        #if($context.arguments.flag)
        #set($v1 = "a")
        #else
        #set($v1 = "b")
        #end
        #return($v1)
        "###);
    }

    #[test]
    fn coalesce_and_postfix() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let zero = b.number(0.0);
            let count = b.let_decl("count", Some(zero));
            let input = b.ident("input");
            let limit = b.prop(input, "limit");
            let ten = b.number(10.0);
            let fallback = b.binary(limit, BinaryOp::Coalesce, ten);
            let decl = b.const_decl("limit", fallback);
            let target = b.ident("count");
            let bump = b.postfix(target, template_synth::PostfixOp::Increment);
            let stmt = b.expr_stmt(bump);
            vec![count, decl, stmt]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.count = 0)",
                "#set($v1 = $context.arguments.limit)",
                "#if($v1 == $null)",
                "#set($v1 = 10)",
                "#end",
                "#set($context.stash.limit = $v1)",
                "#set($context.stash.count = $context.stash.count + 1)",
            ])
        );
    }

    #[test]
    fn builtins_and_membership() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let json = b.ident("JSON");
            let input = b.ident("input");
            let text = b.method(json, "stringify", vec![input]);
            let decl = b.const_decl("text", text);
            let key = b.string("id");
            let ctx = b.ident("ctx");
            let has = b.binary(key, BinaryOp::In, ctx);
            vec![decl, b.return_stmt(Some(has))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.text = $util.toJson($context.arguments))",
                "#return($context.containsKey(\"id\"))",
            ])
        );
    }

    #[test]
    fn call_arguments_are_materialized() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let util = b.ident("$util");
            let input = b.ident("input");
            let a = b.prop(input, "a");
            let one = b.number(1.0);
            let sum = b.binary(a, BinaryOp::Add, one);
            let call = b.method(util, "toJson", vec![sum]);
            vec![b.return_stmt(Some(call))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = ($context.arguments.a + 1))",
                "#return($util.toJson($v1))",
            ])
        );
    }

    #[test]
    fn prefix_step_yields_updated_value() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let zero = b.number(0.0);
            let count = b.let_decl("count", Some(zero));
            let target = b.ident("count");
            let bumped = b.unary(UnaryOp::Increment, target);
            let decl = b.const_decl("n", bumped);
            let target = b.ident("count");
            let dropped = b.unary(UnaryOp::Decrement, target);
            vec![count, decl, b.return_stmt(Some(dropped))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.count = 0)",
                "#set($context.stash.count = $context.stash.count + 1)",
                "#set($context.stash.n = $context.stash.count)",
                "#set($context.stash.count = $context.stash.count - 1)",
                "#return($context.stash.count)",
            ])
        );
    }

    #[test]
    fn coalesce_assign_guards_on_null() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let input = b.ident("input");
            let x = b.prop(input, "x");
            let decl = b.let_decl("x", Some(x));
            let target = b.ident("x");
            let five = b.number(5.0);
            let fill = b.binary(target, BinaryOp::CoalesceAssign, five);
            let stmt = b.expr_stmt(fill);
            let result = b.ident("x");
            vec![decl, stmt, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.x = $context.arguments.x)",
                "#if($context.stash.x == $null)",
                "#set($context.stash.x = 5)",
                "#end",
                "#return($context.stash.x)",
            ])
        );
    }

    #[test]
    fn computed_and_numeric_keys() {
        let out = resolver_expr(|b| {
            // { [input.key]: 1, 2: "two" }
            let input = b.ident("input");
            let key = b.prop(input, "key");
            let one = b.number(1.0);
            let first = b.computed_property(key, one);
            let name = b.number(2.0);
            let value = b.string("two");
            let second = b.push(Node::PropertyAssignment { name, value });
            b.object(vec![first, second])
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = {})",
                "$util.qr($v1.put($context.arguments.key, 1))",
                "$util.qr($v1.put(\"2\", \"two\"))",
                "#return($v1)",
            ])
        );
    }

    #[test]
    fn list_operation_without_callback_is_unsupported() {
        let err = resolver_expr(|b| {
            let input = b.ident("input");
            let items = b.prop(input, "items");
            let input = b.ident("input");
            let transform = b.prop(input, "transform");
            b.method(items, "map", vec![transform])
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
        assert!(err.to_string().contains("`map` without an inline callback"));
    }
}

// ============================================================================
// Control flow
// ============================================================================

mod control_flow {
    use super::*;

    #[test]
    fn for_of_with_break_and_template() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let empty = b.array(vec![]);
            let decl = b.const_decl("out", empty);

            let item = b.ident("item");
            let input = b.ident("input");
            let items = b.prop(input, "items");

            let current = b.ident("item");
            let skip = b.prop(current, "skip");
            let stop = b.break_stmt();
            let stop_block = b.block(vec![stop]);
            let guard = b.if_stmt(skip, stop_block, None);

            let out_ref = b.ident("out");
            let current = b.ident("item");
            let id = b.prop(current, "id");
            let label = b.template("id-", vec![(id, "")]);
            let push = b.method(out_ref, "push", vec![label]);
            let push_stmt = b.expr_stmt(push);

            let body = b.block(vec![guard, push_stmt]);
            let each = b.for_of(item, items, body);
            let result = b.ident("out");
            vec![decl, each, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.out = [])",
                "#foreach($item in $context.arguments.items)",
                "#if($item.skip)",
                "#break",
                "#end",
                "$util.qr($context.stash.out.add(\"id-${item.id}\"))",
                "#end",
                "#return($context.stash.out)",
            ])
        );
    }

    #[test]
    fn if_else_with_returns() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let input = b.ident("input");
            let ok = b.prop(input, "ok");
            let yes = b.string("yes");
            let ret_yes = b.return_stmt(Some(yes));
            let then = b.block(vec![ret_yes]);
            let no = b.string("no");
            let ret_no = b.return_stmt(Some(no));
            let otherwise = b.block(vec![ret_no]);
            vec![b.if_stmt(ok, then, Some(otherwise))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#if($context.arguments.ok)",
                "#return(\"yes\")",
                "#else",
                "#return(\"no\")",
                "#end",
            ])
        );
    }

    #[test]
    fn for_in_iterates_keys() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let empty = b.array(vec![]);
            let decl = b.const_decl("out", empty);
            let key = b.ident("k");
            let input = b.ident("input");
            let out_ref = b.ident("out");
            let current = b.ident("k");
            let push = b.method(out_ref, "push", vec![current]);
            let push_stmt = b.expr_stmt(push);
            let body = b.block(vec![push_stmt]);
            let each = b.for_in(key, input, body);
            let result = b.ident("out");
            vec![decl, each, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.out = [])",
                "#foreach($k in $context.arguments.keySet())",
                "$util.qr($context.stash.out.add($k))",
                "#end",
                "#return($context.stash.out)",
            ])
        );
    }

    #[test]
    fn unsupported_statements() {
        let cases: Vec<Box<dyn Fn(&mut IrBuilder) -> NodeId>> = vec![
            Box::new(|b| {
                let cond = b.boolean(true);
                let body = b.block(vec![]);
                b.while_loop(cond, body)
            }),
            Box::new(|b| {
                let body = b.block(vec![]);
                b.try_stmt(body, None, None)
            }),
            Box::new(|b| {
                let message = b.string("boom");
                b.throw_stmt(message)
            }),
            Box::new(|b| {
                let input = b.ident("input");
                let kind = b.type_of(input);
                b.return_stmt(Some(kind))
            }),
            Box::new(|b| {
                let item = b.ident("x");
                let input = b.ident("input");
                let skip = b.continue_stmt();
                let body = b.block(vec![skip]);
                b.for_of(item, input, body)
            }),
        ];
        for case in cases {
            let err = resolver(&AppsyncConfig::default(), |b| vec![case(b)]).unwrap_err();
            assert_eq!(err.code(), ErrorCode::UnsupportedConstruct, "{err}");
        }
    }
}

// ============================================================================
// List fusion
// ============================================================================

mod fusion {
    use super::*;

    fn map_map(b: &mut IrBuilder) -> NodeId {
        // input.items.map(x => x + 1).map(y => y * 2)
        let input = b.ident("input");
        let items = b.prop(input, "items");
        let x = b.ident("x");
        let one = b.number(1.0);
        let inc = b.binary(x, BinaryOp::Add, one);
        let f = b.arrow(&["x"], inc);
        let first = b.method(items, "map", vec![f]);
        let y = b.ident("y");
        let two = b.number(2.0);
        let double = b.binary(y, BinaryOp::Mul, two);
        let g = b.arrow(&["y"], double);
        b.method(first, "map", vec![g])
    }

    #[test]
    fn map_chain_shares_one_loop() {
        let out = resolver_expr(map_map).unwrap();
        assert_eq!(out.template.matches("#foreach").count(), 1);
        assert_eq!(out.template.matches(".add(").count(), 1);
        insta::assert_snapshot!(out.template, @r###"
        #set($v1 = [])
        #foreach($x in $context.arguments.items)
        #set($v2 = ($x + 1))
        #set($y = $v2)
        #set($v3 = ($y * 2))
        $util.qr($v1.add($v3))
        #end
        #return($v1)
        "###);
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = resolver_expr(map_map).unwrap();
        let second = resolver_expr(map_map).unwrap();
        assert_eq!(first, second);
    }

    fn sum(b: &mut IrBuilder, initial: Option<f64>) -> NodeId {
        // input.items.reduce((acc, x) => acc + x, initial?)
        let input = b.ident("input");
        let items = b.prop(input, "items");
        let acc = b.ident("acc");
        let x = b.ident("x");
        let add = b.binary(acc, BinaryOp::Add, x);
        let reducer = b.arrow(&["acc", "x"], add);
        let mut args = vec![reducer];
        if let Some(initial) = initial {
            args.push(b.number(initial));
        }
        b.method(items, "reduce", args)
    }

    #[test]
    fn reduce_without_initial_guards_and_seeds() {
        let out = resolver_expr(|b| sum(b, None)).unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#if($context.arguments.items.isEmpty())",
                "$util.error(\"Reduce of empty array with no initial value\", \"EmptyReduceNoInitial\")",
                "#end",
                "#foreach($x in $context.arguments.items)",
                "#if($foreach.index == 0)",
                "#set($v1 = $x)",
                "#else",
                "#set($acc = $v1)",
                "#set($v2 = ($acc + $x))",
                "#set($v1 = $v2)",
                "#end",
                "#end",
                "#return($v1)",
            ])
        );
    }

    #[test]
    fn reduce_with_initial() {
        let out = resolver_expr(|b| sum(b, Some(0.0))).unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = 0)",
                "#foreach($x in $context.arguments.items)",
                "#set($acc = $v1)",
                "#set($v2 = ($acc + $x))",
                "#set($v1 = $v2)",
                "#end",
                "#return($v1)",
            ])
        );
        assert!(!out.template.contains("isEmpty"));
    }

    #[test]
    fn reduce_binds_index_and_array() {
        let out = resolver_expr(|b| {
            // input.items.reduce((acc, x, i, all) => acc + i, 0)
            let input = b.ident("input");
            let items = b.prop(input, "items");
            let acc = b.ident("acc");
            let i = b.ident("i");
            let add = b.binary(acc, BinaryOp::Add, i);
            let reducer = b.arrow(&["acc", "x", "i", "all"], add);
            let zero = b.number(0.0);
            b.method(items, "reduce", vec![reducer, zero])
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = 0)",
                "#foreach($x in $context.arguments.items)",
                "#set($acc = $v1)",
                "#set($i = $foreach.index)",
                "#set($all = $context.arguments.items)",
                "#set($v2 = ($acc + $i))",
                "#set($v1 = $v2)",
                "#end",
                "#return($v1)",
            ])
        );
    }

    #[test]
    fn reduce_consumes_map_chain() {
        let out = resolver_expr(|b| {
            // input.items.map(x => x.price).reduce((acc, p) => acc + p, 0)
            let input = b.ident("input");
            let items = b.prop(input, "items");
            let x = b.ident("x");
            let price = b.prop(x, "price");
            let f = b.arrow(&["x"], price);
            let prices = b.method(items, "map", vec![f]);
            let acc = b.ident("acc");
            let p = b.ident("p");
            let add = b.binary(acc, BinaryOp::Add, p);
            let reducer = b.arrow(&["acc", "p"], add);
            let zero = b.number(0.0);
            b.method(prices, "reduce", vec![reducer, zero])
        })
        .unwrap();
        assert_eq!(out.template.matches("#foreach").count(), 1);
        assert!(out.template.contains("#set($p = $v2)"));
    }

    #[test]
    fn block_callback_returns_into_slot() {
        let out = resolver_expr(|b| {
            // input.items.map(x => { const y = x.id; return y; })
            let input = b.ident("input");
            let items = b.prop(input, "items");
            let x = b.ident("x");
            let id = b.prop(x, "id");
            let decl = b.const_decl("y", id);
            let y = b.ident("y");
            let ret = b.return_stmt(Some(y));
            let body = b.block(vec![decl, ret]);
            let f = b.arrow(&["x"], body);
            b.method(items, "map", vec![f])
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($v1 = [])",
                "#foreach($x in $context.arguments.items)",
                "#set($v2 = $null)",
                "#set($y = $x.id)",
                "#set($v2 = $y)",
                "$util.qr($v1.add($v2))",
                "#end",
                "#return($v1)",
            ])
        );
    }
}

// ============================================================================
// Destructuring
// ============================================================================

mod destructuring {
    use super::*;

    #[test]
    fn object_rest_copies_remaining_keys() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let a = b.binding("a");
            let rest = b.rest_binding("rest");
            let pattern = b.object_pattern(vec![a, rest]);
            let input = b.ident("input");
            let decl = b.declare(DeclKind::Const, pattern, Some(input));
            let result = b.ident("rest");
            vec![decl, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.a = $context.arguments.a)",
                "#set($v1 = {})",
                "#foreach($v2 in $context.arguments.keySet())",
                "#if($v2 != \"a\")",
                "$util.qr($v1.put($v2, $context.arguments.get($v2)))",
                "#end",
                "#end",
                "#set($context.stash.rest = $v1)",
                "#return($context.stash.rest)",
            ])
        );
    }

    #[test]
    fn loop_over_pattern_binding() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let id = b.binding("id");
            let pattern = b.object_pattern(vec![id]);
            let input = b.ident("input");
            let items = b.prop(input, "items");
            let id_use = b.ident("id");
            let util = b.ident("$util");
            let log = b.method(util, "log", vec![id_use]);
            let stmt = b.expr_stmt(log);
            let body = b.block(vec![stmt]);
            vec![b.for_of(pattern, items, body)]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#foreach($v1 in $context.arguments.items)",
                "#set($id = $v1.id)",
                "$util.qr($util.log($id))",
                "#end",
            ])
        );
    }

    #[test]
    fn computed_and_numeric_pattern_keys() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            // const { [input.k]: a, 0: first } = input.obj
            let input = b.ident("input");
            let k = b.prop(input, "k");
            let computed = b.push(Node::ComputedPropertyName { expr: k });
            let a = b.ident("a");
            let a = b.binding_element(a, Some(computed), None, false);
            let zero = b.number(0.0);
            let first = b.ident("first");
            let first = b.binding_element(first, Some(zero), None, false);
            let pattern = b.object_pattern(vec![a, first]);
            let input = b.ident("input");
            let obj = b.prop(input, "obj");
            let decl = b.declare(DeclKind::Const, pattern, Some(obj));
            let result = b.ident("first");
            vec![decl, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.a = $context.arguments.obj[$context.arguments.k])",
                "#set($context.stash.first = $context.arguments.obj[\"0\"])",
                "#return($context.stash.first)",
            ])
        );
    }

    #[test]
    fn array_pattern_with_default_nesting_and_rest() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            // const [{ id } = { id: 0 }, , ...others] = input.rows
            let id = b.binding("id");
            let inner = b.object_pattern(vec![id]);
            let zero = b.number(0.0);
            let id_prop = b.property("id", zero);
            let fallback = b.object(vec![id_prop]);
            let head = b.binding_element(inner, None, Some(fallback), false);
            let hole = b.omitted();
            let others = b.rest_binding("others");
            let pattern = b.array_pattern(vec![head, hole, others]);
            let input = b.ident("input");
            let rows = b.prop(input, "rows");
            let decl = b.declare(DeclKind::Const, pattern, Some(rows));
            let result = b.ident("others");
            vec![decl, b.return_stmt(Some(result))]
        })
        .unwrap();
        insta::assert_snapshot!(out.template, @r###"
        #set($v1 = $context.arguments.rows[0])
        #if($v1 == $null)
        #set($v2 = {})
        $util.qr($v2.put("id", 0))
        #set($v1 = $v2)
        #end
        #set($context.stash.id = $v1.id)
        #set($context.stash.others = $context.arguments.rows.subList(2, $context.arguments.rows.size()))
        #return($context.stash.others)
        "###);
    }
}

// ============================================================================
// Integrations
// ============================================================================

mod integrations {
    use super::*;

    #[test]
    fn awaited_call_is_dispatched() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let lookup = b.integration("lookup", Arc::new(Invoke("lookup")));
            let input = b.ident("input");
            let id = b.prop(input, "id");
            let call = b.call(lookup, vec![id]);
            let awaited = b.await_expr(call);
            let decl = b.const_decl("result", awaited);
            let result = b.ident("result");
            vec![decl, b.return_stmt(Some(result))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.request = {\"function\": \"lookup\", \"payload\": $context.arguments.id})",
                "#set($context.stash.result = $context.prev.result)",
                "#return($context.stash.result)",
            ])
        );
        assert_eq!(out.integrations, vec!["lookup".to_string()]);
    }

    fn two_calls(b: &mut IrBuilder) -> Vec<NodeId> {
        let first = b.integration("first", Arc::new(Invoke("first")));
        let second = b.integration("second", Arc::new(Invoke("second")));
        let call_first = b.call(first, vec![]);
        let call_second = b.call(second, vec![]);
        let a = b.const_decl("a", call_first);
        let c = b.const_decl("c", call_second);
        vec![a, c]
    }

    #[test]
    fn single_integration_is_configurable() {
        let out = resolver(&AppsyncConfig::default(), two_calls).unwrap();
        assert_eq!(out.integrations, vec!["first".to_string(), "second".to_string()]);

        let strict = AppsyncConfig {
            single_integration: true,
            ..AppsyncConfig::default()
        };
        let err = resolver(&strict, two_calls).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalIntegrationPosition);
    }

    #[test]
    fn unawaited_promise_is_illegal() {
        let err = resolver(&AppsyncConfig::default(), |b| {
            let lookup = b.integration("lookup", Arc::new(Invoke("lookup")));
            let call = b.call(lookup, vec![]);
            let pending = b.promise(call);
            vec![b.const_decl("pending", pending)]
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalIntegrationPosition);
    }

    #[test]
    fn awaited_or_returned_promise_is_accepted() {
        let out = resolver(&AppsyncConfig::default(), |b| {
            let lookup = b.integration("lookup", Arc::new(Invoke("lookup")));
            let call = b.call(lookup, vec![]);
            let pending = b.promise(call);
            let awaited = b.await_expr(pending);
            let decl = b.const_decl("first", awaited);
            let again = b.integration("again", Arc::new(Invoke("again")));
            let call = b.call(again, vec![]);
            let pending = b.promise(call);
            vec![decl, b.return_stmt(Some(pending))]
        })
        .unwrap();
        assert_eq!(
            out.template,
            lines(&[
                "#set($context.stash.request = {\"function\": \"lookup\", \"payload\": $null})",
                "#set($context.stash.first = $context.prev.result)",
                "#set($context.stash.request = {\"function\": \"again\", \"payload\": $null})",
                "#return($context.prev.result)",
            ])
        );
        assert_eq!(out.integrations, vec!["lookup".to_string(), "again".to_string()]);
    }

    #[test]
    fn handler_without_dialect_support() {
        let mut b = IrBuilder::new();
        let input = b.param("input");
        let handle = b.integration("only", Arc::new(ResolverOnly));
        let call = b.call(handle, vec![]);
        let root = b.function(vec![input], call);
        let ir = b.finish().unwrap();

        let err = ApiGateway::compile(&ir, root, Direction::Request, &ApiGatewayConfig::default())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
        assert!(err.to_string().contains("resolver.only"));
    }
}

// ============================================================================
// JSON-path mapping templates
// ============================================================================

mod mapping {
    use super::*;

    /// Build `(input) => expr` and compile it in one direction.
    fn mapping(
        direction: Direction,
        build: impl FnOnce(&mut IrBuilder) -> NodeId,
    ) -> Result<String, SynthError> {
        let mut b = IrBuilder::new();
        let input = b.param("input");
        let body = build(&mut b);
        let root = b.function(vec![input], body);
        let ir = b.finish().unwrap();
        ApiGateway::compile(&ir, root, direction, &ApiGatewayConfig::default())
            .map(|out| out.template)
    }

    #[test]
    fn pure_path_skips_dispatch() {
        let template = mapping(Direction::Response, |b| {
            let input = b.ident("input");
            let body = b.prop(input, "body");
            b.prop(body, "id")
        })
        .unwrap();
        assert_eq!(template, "$input.json('$.body.id')");
        assert!(!template.contains(".class.name"));
    }

    #[test]
    fn bracketed_keys_stay_inside_the_path_argument() {
        let template = mapping(Direction::Request, |b| {
            let input = b.ident("input");
            let key = b.string("first-name");
            b.element(input, key)
        })
        .unwrap();
        assert_eq!(template, "$input.json('$[\"first-name\"]')");

        let template = mapping(Direction::Request, |b| {
            let input = b.ident("input");
            b.prop(input, "it's")
        })
        .unwrap();
        assert_eq!(template, "$input.json('$[\"it''s\"]')");
    }

    #[test]
    fn template_values_are_escaped() {
        let template = mapping(Direction::Request, |b| {
            let input = b.ident("input");
            let name = b.prop(input, "name");
            let greeting = b.template("hi ", vec![(name, "")]);
            let field = b.property("greeting", greeting);
            b.object(vec![field])
        })
        .unwrap();
        assert_eq!(
            template,
            lines(&[
                "#set($v1 = $input.path('$').name)",
                "#set($v2 = \"hi ${v1}\")",
                "{\"greeting\":\"$util.escapeJavaScript($v2)\"}",
            ])
        );
    }

    #[test]
    fn strings_with_template_syntax_are_escaped() {
        let template = mapping(Direction::Response, |b| {
            let note = b.string("costs $5");
            let field = b.property("note", note);
            b.object(vec![field])
        })
        .unwrap();
        assert_eq!(
            template,
            lines(&[
                "#set($v1 = 'costs $5')",
                "{\"note\":\"$util.escapeJavaScript($v1)\"}",
            ])
        );
    }

    #[test]
    fn computed_value_uses_dispatch() {
        let template = mapping(Direction::Response, |b| {
            let input = b.ident("input");
            let first = b.prop(input, "first");
            let input = b.ident("input");
            let last = b.prop(input, "last");
            b.binary(first, BinaryOp::Or, last)
        })
        .unwrap();
        assert!(template.contains(".class.name"));
        assert!(template.contains("$util.escapeJavaScript($v1)"));
    }

    #[test]
    fn composite_fallback_is_unsupported() {
        let err = mapping(Direction::Response, |b| {
            let input = b.ident("input");
            let flag = b.prop(input, "flag");
            let empty = b.array(vec![]);
            let input = b.ident("input");
            let items = b.prop(input, "items");
            b.conditional(flag, empty, items)
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
    }

    #[test]
    fn request_integration() {
        let template = mapping(Direction::Request, |b| {
            let invoke = b.integration("invoke", Arc::new(Invoke("invoke")));
            let input = b.ident("input");
            let id = b.prop(input, "id");
            let id_prop = b.property("id", id);
            let payload = b.object(vec![id_prop]);
            b.call(invoke, vec![payload])
        })
        .unwrap();
        assert_eq!(
            template,
            "{\"function\":\"invoke\",\"payload\":{\"id\":$input.json('$.id')}}"
        );
    }

    #[test]
    fn response_integration_is_illegal() {
        let err = mapping(Direction::Response, |b| {
            let invoke = b.integration("invoke", Arc::new(Invoke("invoke")));
            b.call(invoke, vec![])
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IllegalIntegrationPosition);
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn loaded_config_drives_compilation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synth.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[appsync]\nstash_locals = false").unwrap();

        let config = SynthConfig::load(&path).unwrap();
        let out = resolver(&config.appsync, |b| {
            let one = b.number(1.0);
            let decl = b.const_decl("x", one);
            let x = b.ident("x");
            vec![decl, b.return_stmt(Some(x))]
        })
        .unwrap();
        assert_eq!(out.template, "#set($x = 1)\n#return($x)");
    }

    #[test]
    fn targets_compile_by_name() {
        let mut b = IrBuilder::new();
        let input = b.param("input");
        let payload = b.ident("input");
        let id = b.prop(payload, "id");
        let root = b.function(vec![input], id);
        let ir = b.finish().unwrap();
        let config = SynthConfig::default();

        let resolver = template_synth::target_for_name("appsync").unwrap();
        assert_eq!(
            resolver.compile(&ir, root, &config).unwrap(),
            "#return($context.arguments.id)"
        );
        let request = template_synth::target_for_name("apigateway-request").unwrap();
        assert_eq!(
            request.compile(&ir, root, &config).unwrap(),
            "$input.json('$.id')"
        );
    }

    #[test]
    fn mapping_assembles_directions() {
        let mut b = IrBuilder::new();
        let input = b.param("input");
        let payload = b.ident("input");
        let root = b.function(vec![input], payload);
        let ir = b.finish().unwrap();
        let config = ApiGatewayConfig::default();

        let request = ApiGateway::compile(&ir, root, Direction::Request, &config).unwrap();
        let response = ApiGateway::compile(&ir, root, Direction::Response, &config).unwrap();
        let failure = ApiGateway::compile(&ir, root, Direction::Response, &config).unwrap();
        let mapping = IntegrationMapping::new(request, response)
            .unwrap()
            .with_status(500, failure)
            .unwrap();
        insta::assert_json_snapshot!(mapping, @r###"
        {
          "requestTemplates": {
            "application/json": "$input.json('$')"
          },
          "integrationResponses": [
            {
              "statusCode": "200",
              "responseTemplates": {
                "application/json": "$input.json('$')"
              }
            },
            {
              "statusCode": "500",
              "selectionPattern": "^500$",
              "responseTemplates": {
                "application/json": "$input.json('$')"
              }
            }
          ]
        }
        "###);
    }
}
