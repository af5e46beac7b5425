use df2::{Array, Df2Stream, Kind, Value};
use proptest::prelude::*;

fn roundtrip(value: Value) -> Value {
    let mut bytes = Vec::new();
    let mut writer = Df2Stream::writer(&mut bytes).unwrap();
    writer
        .get_or_add_group("Data")
        .unwrap()
        .add_or_update("Value", value)
        .unwrap();
    writer.flush().unwrap();

    let mut reader = Df2Stream::reader(&bytes[..]).unwrap();
    reader.process_until_end().unwrap();
    assert!(reader.is_ended());
    reader.get("/Data/Value").unwrap().value().unwrap().clone()
}

fn big_strings() -> Vec<String> {
    let text = "English 日本語 русский язык 官話 🌄 ";
    vec![
        "A".repeat(1024 * 1024),
        text.repeat(1024 * 1024 / text.len()),
    ]
}

#[test]
fn scalar_extremes() {
    let values = [
        Value::from(u8::MIN),
        Value::from(u8::MAX),
        Value::from(42u8),
        Value::from(i8::MIN),
        Value::from(i8::MAX),
        Value::from(i16::MIN),
        Value::from(i16::MAX),
        Value::from(u16::MAX),
        Value::from(i32::MIN),
        Value::from(-1i32),
        Value::from(i32::MAX),
        Value::from(u32::MAX),
        Value::from(i64::MIN),
        Value::from(i64::MAX),
        Value::from(u64::MAX),
        Value::from(""),
        Value::from("English 日本語 русский язык 官話 🌄"),
    ];
    for value in values {
        assert_eq!(roundtrip(value.clone()), value);
    }
}

#[test]
fn floats_are_bit_exact() {
    let floats = [
        f32::NAN,
        f32::from_bits(0x7fc0_1234),
        f32::INFINITY,
        f32::NEG_INFINITY,
        -0.0,
        f32::MIN_POSITIVE,
        f32::MAX,
    ];
    for f in floats {
        let back = roundtrip(Value::from(f)).as_float().unwrap();
        assert_eq!(back.to_bits(), f.to_bits(), "{f}");
    }
    let doubles = [
        f64::NAN,
        f64::from_bits(0xfff8_0000_dead_beef),
        f64::INFINITY,
        f64::NEG_INFINITY,
        -0.0,
        f64::EPSILON,
        f64::MIN,
    ];
    for d in doubles {
        let back = roundtrip(Value::from(d)).as_double().unwrap();
        assert_eq!(back.to_bits(), d.to_bits(), "{d}");
    }
}

#[test]
fn large_strings() {
    for s in big_strings() {
        assert_eq!(roundtrip(Value::from(s.clone())).as_str(), Some(s.as_str()));
    }
}

#[test]
fn arrays_of_every_scalar_kind() {
    let arrays = [
        Value::from(vec![u8::MIN, 42, u8::MAX]),
        Value::from(vec![i8::MIN, 0, i8::MAX]),
        Value::from(vec![i16::MIN, -1, i16::MAX]),
        Value::from(vec![0u16, 300, u16::MAX]),
        Value::from(vec![i32::MIN, i32::MAX]),
        Value::from(vec![0u32, u32::MAX]),
        Value::from(vec![i64::MIN, 0, i64::MAX]),
        Value::from(vec![u64::MAX]),
        Value::from(vec![f32::NAN, f32::NEG_INFINITY, 1.5]),
        Value::from(vec![f64::NAN, f64::INFINITY, -2.25]),
        Value::from(vec!["a".to_string(), String::new(), "🌄".to_string()]),
        Value::from(Vec::<u64>::new()),
    ];
    for array in arrays {
        let back = roundtrip(array.clone());
        assert_eq!(back.kind(), Kind::Array);
        assert_eq!(back, array);
    }
}

#[test]
fn array_keeps_element_kind_when_empty() {
    let back = roundtrip(Value::from(Vec::<i16>::new()));
    let array = back.as_array().unwrap();
    assert!(array.is_empty());
    assert_eq!(array.element_kind(), Kind::Short);
    assert_eq!(array, &Array::Short(Vec::new()));
}

#[test]
fn heterogeneous_and_nested_lists() {
    let list = Value::list([
        Value::from(1u8),
        Value::from(-7i64),
        Value::from("two"),
        Value::from(3.0f64),
        Value::list([Value::from(u64::MAX), Value::list(Vec::<Value>::new())]),
    ]);
    assert_eq!(roundtrip(list.clone()), list);
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u8>().prop_map(Value::from),
        any::<i8>().prop_map(Value::from),
        any::<i16>().prop_map(Value::from),
        any::<u16>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<u32>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<u32>().prop_map(|bits| Value::from(f32::from_bits(bits))),
        any::<u64>().prop_map(|bits| Value::from(f64::from_bits(bits))),
        "[^\\x00]{0,24}".prop_map(Value::from),
    ]
}

fn array() -> impl Strategy<Value = Value> {
    use proptest::collection::vec;
    prop_oneof![
        vec(any::<u8>(), 0..16).prop_map(Value::from),
        vec(any::<i16>(), 0..16).prop_map(Value::from),
        vec(any::<u32>(), 0..16).prop_map(Value::from),
        vec(any::<i64>(), 0..16).prop_map(Value::from),
        vec(any::<u32>(), 0..16)
            .prop_map(|bits| Value::from(bits.into_iter().map(f32::from_bits).collect::<Vec<_>>())),
        vec("[^\\x00]{0,8}", 0..6).prop_map(Value::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    let list = scalar().prop_recursive(3, 24, 4, |inner| {
        proptest::collection::vec(inner, 0..4).prop_map(Value::List)
    });
    prop_oneof![scalar(), array(), list]
}

proptest! {
    #[test]
    fn any_value_roundtrips(v in value()) {
        prop_assert_eq!(roundtrip(v.clone()), v);
    }
}
