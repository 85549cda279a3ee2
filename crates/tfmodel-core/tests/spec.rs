use tfmodel_core::{DType, DTypeCategory, IOName, ModelSpec, Shape, SignatureSpec, TensorSpec};

fn signature(name: &str) -> SignatureSpec {
    SignatureSpec {
        name: name.to_string(),
        method_name: "tensorflow/serving/predict".to_string(),
        inputs: Vec::new(),
        outputs: Vec::new(),
    }
}

#[test]
fn dtype_codes_round_trip_through_the_table() {
    assert_eq!(DType::from_code(1), DType::F32);
    assert_eq!(DType::from_code(7), DType::String);
    assert_eq!(DType::from_code(10), DType::Bool);
    assert_eq!(DType::from_code(23), DType::U64);
    assert_eq!(DType::from_code(1).code(), 1);
    assert_eq!(DType::from_code(0), DType::Unknown(0));
    assert_eq!(DType::Unknown(42).code(), 42);
}

#[test]
fn dtype_names_follow_tensorflow() {
    assert_eq!(DType::F32.to_string(), "DT_FLOAT");
    assert_eq!(DType::F16.to_string(), "DT_HALF");
    assert_eq!(DType::Unknown(99).to_string(), "DT_UNKNOWN(99)");
}

#[test]
fn dtype_categories() {
    assert_eq!(DType::U16.category(), DTypeCategory::Integer);
    assert_eq!(DType::I64.category(), DTypeCategory::Integer);
    assert_eq!(DType::Bool.category(), DTypeCategory::Boolean);
    assert_eq!(DType::String.category(), DTypeCategory::Text);
    assert_eq!(DType::BF16.category(), DTypeCategory::Floating);
    assert_eq!(DType::QI8.category(), DTypeCategory::Unrecognized);
    assert_eq!(DType::Unknown(5000).category(), DTypeCategory::Unrecognized);
}

#[test]
fn io_name_splits_output_index() {
    assert_eq!(IOName::from("Placeholder:0").op_and_index(), ("Placeholder", 0));
    assert_eq!(IOName::from("scope/Softmax:2").op_and_index(), ("scope/Softmax", 2));
    assert_eq!(IOName::from("plain").op_and_index(), ("plain", 0));
    assert_eq!(IOName::from("odd:name").op_and_index(), ("odd:name", 0));
}

#[test]
fn shape_strings() {
    let mut spec = TensorSpec::new("x", "x:0", DType::F32, &[-1, 9]);
    assert_eq!(spec.shape_string(), "[-1, 9]");
    spec.dims = None;
    assert_eq!(spec.shape_string(), "<unknown>");

    assert_eq!(Shape::from_slice(&[]).numel(), 1);
    assert_eq!(Shape::from_slice(&[4, 0]).numel(), 0);
    assert_eq!(Shape::from_slice(&[2, 3]).to_string(), "[2, 3]");
}

#[test]
fn default_signature_prefers_serving_default() {
    let mut spec = ModelSpec {
        tags: vec!["serve".to_string()],
        signatures: vec![signature("predict"), signature("serving_default")],
        tensorflow_version: None,
    };
    assert_eq!(
        spec.default_signature().map(|s| s.name.as_str()),
        Some("serving_default")
    );

    spec.signatures = vec![signature("zeta"), signature("alpha")];
    assert_eq!(spec.default_signature().map(|s| s.name.as_str()), Some("alpha"));

    spec.signatures.clear();
    assert!(spec.default_signature().is_none());
}
