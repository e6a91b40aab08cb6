use crate::builder::BuilderNode;
use crate::error::ExprError;
use crate::store::{Dataset, MemoryStore};
use crate::value::{ArrayValue, Complex32, Complex64, DataType};

// ── Shared fixture runners ──────────────────────────────────────────

/// Embed fixture files at compile time.
const EVAL_FIXTURES: &str = include_str!("../test-data/fixtures/eval.json");
const PARSE_ERROR_FIXTURES: &str = include_str!("../test-data/fixtures/parse-errors.json");

const EPSILON: f64 = 1e-6;

/// Compare a one-element result buffer against the fixture's expected
/// JSON value (bool, number, [re, im] pair, or string).
fn assert_scalar_result(name: &str, value: &ArrayValue, expected: &serde_json::Value) {
    assert_eq!(value.len(), 1, "Fixture '{}': expected a scalar result", name);
    match (value, expected) {
        (ArrayValue::Bool(v), serde_json::Value::Bool(b)) => {
            assert_eq!(v[0], *b, "Fixture '{}': value mismatch", name);
        }
        (ArrayValue::Int(v), e) if e.is_i64() => {
            assert_eq!(v[0], e.as_i64().unwrap(), "Fixture '{}': value mismatch", name);
        }
        (ArrayValue::Float(v), e) if e.is_number() => {
            let got = v[0] as f64;
            let want = e.as_f64().unwrap();
            assert!(
                (got - want).abs() < EPSILON,
                "Fixture '{}': got {}, expected {}",
                name,
                got,
                want
            );
        }
        (ArrayValue::Double(v), e) if e.is_number() => {
            let want = e.as_f64().unwrap();
            assert!(
                (v[0] - want).abs() < EPSILON,
                "Fixture '{}': got {}, expected {}",
                name,
                v[0],
                want
            );
        }
        (ArrayValue::Complex(v), serde_json::Value::Array(pair)) => {
            let re = pair[0].as_f64().unwrap();
            let im = pair[1].as_f64().unwrap();
            assert!(
                (v[0].re as f64 - re).abs() < EPSILON && (v[0].im as f64 - im).abs() < EPSILON,
                "Fixture '{}': got {}, expected {}+{}i",
                name,
                v[0],
                re,
                im
            );
        }
        (ArrayValue::DComplex(v), serde_json::Value::Array(pair)) => {
            let re = pair[0].as_f64().unwrap();
            let im = pair[1].as_f64().unwrap();
            assert!(
                (v[0].re - re).abs() < EPSILON && (v[0].im - im).abs() < EPSILON,
                "Fixture '{}': got {}, expected {}+{}i",
                name,
                v[0],
                re,
                im
            );
        }
        (ArrayValue::Text(v), serde_json::Value::String(s)) => {
            assert_eq!(&v[0], s, "Fixture '{}': value mismatch", name);
        }
        _ => panic!(
            "Fixture '{}': result {:?} does not match expected {:?}",
            name, value, expected
        ),
    }
}

#[test]
fn test_fixture_eval() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(EVAL_FIXTURES).unwrap();
    let store = MemoryStore::new();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();
        let dtype = fixture["dtype"].as_str().unwrap();

        let node = match crate::command(input, &store) {
            Ok(node) => node,
            Err(err) => panic!("Fixture '{}': unexpected error: {}", name, err),
        };
        assert_eq!(
            node.dtype().to_string(),
            dtype,
            "Fixture '{}': type mismatch for '{}'",
            name,
            input
        );
        assert!(node.is_scalar(), "Fixture '{}': expected a scalar node", name);

        let value = node.eval().unwrap();
        assert_scalar_result(name, &value, &fixture["result"]);
    }
}

#[test]
fn test_fixture_parse_errors() {
    let fixtures: Vec<serde_json::Value> = serde_json::from_str(PARSE_ERROR_FIXTURES).unwrap();
    let store = MemoryStore::new();

    for fixture in &fixtures {
        let name = fixture["name"].as_str().unwrap();
        let input = fixture["input"].as_str().unwrap();

        match crate::command(input, &store) {
            Ok(node) => panic!(
                "Fixture '{}': expected a parse error for '{}', got {:?}",
                name, input, node
            ),
            Err(ExprError::Parse { .. }) => {}
            Err(err) => panic!(
                "Fixture '{}': expected a parse error for '{}', got {}",
                name, input, err
            ),
        }
    }
}

// ── Literal construction ────────────────────────────────────────────

#[test]
fn literal_round_trips_preserve_value_and_type() {
    let cases = vec![
        (BuilderNode::bool(true), DataType::Bool, ArrayValue::Bool(vec![true])),
        (BuilderNode::int(42), DataType::Int, ArrayValue::Int(vec![42])),
        (BuilderNode::float(1.5), DataType::Float, ArrayValue::Float(vec![1.5])),
        (BuilderNode::double(2.25), DataType::Double, ArrayValue::Double(vec![2.25])),
        (
            BuilderNode::complex(Complex32::new(1.0, -2.0)),
            DataType::Complex,
            ArrayValue::Complex(vec![Complex32::new(1.0, -2.0)]),
        ),
        (
            BuilderNode::dcomplex(Complex64::new(0.5, 0.25)),
            DataType::DComplex,
            ArrayValue::DComplex(vec![Complex64::new(0.5, 0.25)]),
        ),
        (
            BuilderNode::text("hello"),
            DataType::Text,
            ArrayValue::Text(vec!["hello".to_string()]),
        ),
    ];
    for (builder, dtype, expected) in cases {
        let node = builder.make_literal_node();
        assert_eq!(node.dtype(), dtype);
        assert!(node.is_scalar());
        assert_eq!(node.eval().unwrap(), expected);
    }
}

// ── Name resolution ─────────────────────────────────────────────────

fn store_with(datasets: Vec<Dataset>) -> MemoryStore {
    let mut store = MemoryStore::new();
    for dataset in datasets {
        store.insert(dataset);
    }
    store
}

#[test]
fn lattice_node_never_falls_back_to_constants() {
    let store = MemoryStore::new();
    // "pi" is a known constant, but the dataset-only form must not use it.
    let err = BuilderNode::name("pi").make_lattice_node(&store).unwrap_err();
    assert_eq!(err, ExprError::UnknownDataset("pi".to_string()));
}

#[test]
fn lattice_node_resolves_datasets() {
    let store = store_with(vec![Dataset::new(
        "img",
        vec![2, 3],
        ArrayValue::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
    )]);
    let node = BuilderNode::name("img").make_lattice_node(&store).unwrap();
    assert_eq!(node.dtype(), DataType::Float);
    assert_eq!(node.shape(), &[2, 3]);
}

#[test]
fn literal_node_ignores_dataset_names() {
    // LiteralOnly consults no store: the text stays a text constant
    // even when a dataset of the same name exists.
    let node = BuilderNode::text("a").make_literal_node();
    assert_eq!(node.dtype(), DataType::Text);
    assert_eq!(node.eval().unwrap(), ArrayValue::Text(vec!["a".to_string()]));
}

#[test]
fn litlatt_prefers_dataset_then_constant_then_fails() {
    let store = store_with(vec![Dataset::new(
        "pi",
        vec![2],
        ArrayValue::Int(vec![3, 1]),
    )]);
    // Present in the store: dataset wins even over the constant name.
    let node = BuilderNode::name("pi").make_litlatt_node(&store).unwrap();
    assert_eq!(node.dtype(), DataType::Int);
    assert_eq!(node.shape(), &[2]);

    // Absent from the store but a known constant.
    let node = BuilderNode::name("e").make_litlatt_node(&store).unwrap();
    assert_eq!(node.dtype(), DataType::Double);
    assert_eq!(
        node.eval().unwrap(),
        ArrayValue::Double(vec![std::f64::consts::E])
    );

    // Neither.
    let err = BuilderNode::name("zzz").make_litlatt_node(&store).unwrap_err();
    assert_eq!(err, ExprError::UnresolvedIdentifier("zzz".to_string()));
}

// ── Function assembly ───────────────────────────────────────────────

#[test]
fn func_node_arity_is_never_inferred() {
    let store = MemoryStore::new();
    // sin exists with one argument; two must fail, not degrade.
    let err = crate::command("sin(1, 2)", &store).unwrap_err();
    assert_eq!(
        err,
        ExprError::UnknownFunction {
            name: "sin".to_string(),
            arity: 2
        }
    );
    let err = crate::command("min(1)", &store).unwrap_err();
    assert_eq!(
        err,
        ExprError::UnknownFunction {
            name: "min".to_string(),
            arity: 1
        }
    );
    let err = crate::command("nosuch(1)", &store).unwrap_err();
    assert_eq!(
        err,
        ExprError::UnknownFunction {
            name: "nosuch".to_string(),
            arity: 1
        }
    );
}

#[test]
fn func_node_propagates_type_rejections() {
    let store = MemoryStore::new();
    assert!(matches!(
        crate::command("true + 1", &store).unwrap_err(),
        ExprError::TypeMismatch { .. }
    ));
    assert!(matches!(
        crate::command("!1", &store).unwrap_err(),
        ExprError::TypeMismatch { .. }
    ));
    assert!(matches!(
        crate::command("1 && true", &store).unwrap_err(),
        ExprError::TypeMismatch { .. }
    ));
    assert!(matches!(
        crate::command("sin('text')", &store).unwrap_err(),
        ExprError::TypeMismatch { .. }
    ));
}

// ── End-to-end over datasets ────────────────────────────────────────

#[test]
fn dataset_sum_promotes_and_keeps_shape() {
    let store = store_with(vec![
        Dataset::new("a", vec![2, 2], ArrayValue::Int(vec![1, 2, 3, 4])),
        Dataset::new("b", vec![2, 2], ArrayValue::Float(vec![0.5, 0.5, 0.5, 0.5])),
    ]);
    let node = crate::command("a + b", &store).unwrap();
    assert_eq!(node.dtype(), DataType::Float);
    assert_eq!(node.shape(), &[2, 2]);
    assert_eq!(
        node.eval().unwrap(),
        ArrayValue::Float(vec![1.5, 2.5, 3.5, 4.5])
    );
}

#[test]
fn dataset_scalar_broadcast() {
    let store = store_with(vec![Dataset::new(
        "a",
        vec![3],
        ArrayValue::Double(vec![1.0, 2.0, 3.0]),
    )]);
    let node = crate::command("a * 2 + 1", &store).unwrap();
    assert_eq!(node.dtype(), DataType::Double);
    assert_eq!(node.shape(), &[3]);
    assert_eq!(node.eval().unwrap(), ArrayValue::Double(vec![3.0, 5.0, 7.0]));
}

#[test]
fn dataset_shape_conflict_is_rejected() {
    let store = store_with(vec![
        Dataset::new("a", vec![2], ArrayValue::Int(vec![1, 2])),
        Dataset::new("b", vec![3], ArrayValue::Int(vec![1, 2, 3])),
    ]);
    let err = crate::command("a + b", &store).unwrap_err();
    assert_eq!(
        err,
        ExprError::ShapeMismatch {
            left: vec![2],
            right: vec![3]
        }
    );
}

#[test]
fn quoted_names_are_dataset_only() {
    let store = store_with(vec![Dataset::new(
        "img 1",
        vec![2],
        ArrayValue::Int(vec![5, 6]),
    )]);
    let node = crate::command("\"img 1\" + 1", &store).unwrap();
    assert_eq!(node.eval().unwrap(), ArrayValue::Int(vec![6, 7]));

    let err = crate::command("\"missing\"", &store).unwrap_err();
    assert_eq!(err, ExprError::UnknownDataset("missing".to_string()));
}

#[test]
fn bare_unknown_identifier_is_unresolved() {
    let store = MemoryStore::new();
    let err = crate::command("zzz + 1", &store).unwrap_err();
    assert_eq!(err, ExprError::UnresolvedIdentifier("zzz".to_string()));
}

#[test]
fn same_command_twice_builds_independent_equal_trees() {
    let store = store_with(vec![Dataset::new(
        "a",
        vec![2],
        ArrayValue::Int(vec![1, 2]),
    )]);
    let first = crate::command("a + sin(1.0)", &store).unwrap();
    let second = crate::command("a + sin(1.0)", &store).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.dtype(), second.dtype());
    assert_eq!(first.shape(), second.shape());
    // Both evaluate independently.
    assert_eq!(first.eval().unwrap(), second.eval().unwrap());
}

#[test]
fn failed_parse_yields_no_tree() {
    let store = MemoryStore::new();
    let result = crate::command("badsyntax(", &store);
    assert!(matches!(result, Err(ExprError::Parse { .. })));
}

#[test]
fn parse_error_spans_point_into_the_input() {
    let store = MemoryStore::new();
    let err = crate::command("1 + ", &store).unwrap_err();
    let ExprError::Parse { begin, .. } = err else {
        panic!("expected a parse error, got {:?}", err);
    };
    assert_eq!(begin.line, 0);
    assert_eq!(begin.column, 4);
}
