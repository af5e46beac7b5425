use std::cell::{Cell, RefCell};
use std::rc::Rc;

use df2::{Df2Stream, Direction, Opcode, Value};

fn replay(bytes: &[u8]) -> Df2Stream<&[u8]> {
    let mut reader = Df2Stream::reader(bytes).unwrap();
    reader.process_until_end().unwrap();
    reader
}

fn record_log<S>(stream: &mut Df2Stream<S>) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    stream.on_command(move |event| {
        assert_eq!(event.direction, Direction::Sent);
        sink.borrow_mut().push(event.record.to_string());
    });
    log
}

fn write_recover_and_remove(value: Value) {
    let mut bytes = Vec::new();
    let mut writer = Df2Stream::writer(&mut bytes).unwrap();
    writer
        .get_or_add_group("TestGroup")
        .unwrap()
        .add_or_update("TestData", value.clone())
        .unwrap();
    writer.flush().unwrap();

    let reader = replay(&bytes);
    let stored = reader.root().at("TestGroup").unwrap().at("TestData").unwrap();
    assert_eq!(stored.value(), Some(&value));

    let removes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&removes);
    let mut copy = Df2Stream::writer(Vec::new()).unwrap();
    copy.on_command(move |event| {
        if event.record.opcode == Opcode::Remove {
            counter.set(counter.get() + 1);
        }
    });
    reader.copy_to(&mut copy).unwrap();
    assert!(copy.remove("TestGroup").unwrap());
    copy.flush().unwrap();
    assert_eq!(removes.get(), 1);

    let copied = copy.into_inner();
    let last = replay(&copied);
    assert!(last.root().child("TestGroup").is_none());
    assert_eq!(last.root().children().count(), 0);
}

#[test]
fn write_recover_and_remove_bytes() {
    for data in [u8::MIN, u8::MAX, 42] {
        write_recover_and_remove(Value::from(data));
    }
}

#[test]
fn write_recover_and_remove_other_kinds() {
    write_recover_and_remove(Value::from(i8::MIN));
    write_recover_and_remove(Value::from(i16::MAX));
    write_recover_and_remove(Value::from(u32::MAX));
    write_recover_and_remove(Value::from(i64::MIN));
    write_recover_and_remove(Value::from(f64::NAN));
    write_recover_and_remove(Value::from("text"));
    write_recover_and_remove(Value::from(vec![1u16, 2, 3]));
    write_recover_and_remove(Value::list([Value::from(1u8), Value::from("x")]));
}

#[test]
fn reentering_a_handled_group_uses_its_handle() {
    let value = Value::from(vec![1u32, 2, 3]);
    let mut writer = Df2Stream::writer(Vec::new()).unwrap();
    let log = record_log(&mut writer);

    let mut a_nested = writer
        .get_or_add_group("A")
        .unwrap()
        .get_or_add_group("Nested")
        .unwrap();
    a_nested.set_handle(Some(1)).unwrap();
    let a_nested = a_nested.id();
    writer
        .get_or_add_group("B")
        .unwrap()
        .get_or_add_group("Nested")
        .unwrap()
        .add_or_update("TestData", value.clone())
        .unwrap();

    let before = writer.get_ref().len();
    writer
        .group(a_nested)
        .unwrap()
        .add_or_update("TestData", value.clone())
        .unwrap();
    let reentry = writer.get_ref()[before..].to_vec();
    writer.flush().unwrap();

    assert_eq!(reentry[..3], [Opcode::GroupByHandle.as_u8(), 1, Opcode::Value.as_u8()]);
    assert_eq!(
        *log.borrow(),
        [
            "Group (A);",
            "Group (Nested);",
            "Handle (.) 1;",
            "Group (/B);",
            "Group (Nested);",
            "Value Array (TestData);",
            "GroupByHandle 1;",
            "Value Array (TestData);",
            "End;",
        ]
    );

    let bytes = writer.into_inner();
    let reader = replay(&bytes);
    assert_eq!(reader.get("/A/Nested/TestData").unwrap().value(), Some(&value));
    assert_eq!(reader.get("/B/Nested/TestData").unwrap().value(), Some(&value));
    assert_eq!(reader.handle(1).unwrap().absolute_path(), "/A/Nested/");
}

#[test]
fn repeated_updates_keep_one_child_and_its_handle() {
    let mut writer = Df2Stream::writer(Vec::new()).unwrap();
    let first = writer.add_or_update("name", 1u8).unwrap();
    writer.set_handle(first, Some(7)).unwrap();
    let second = writer.add_or_update("name", 2u8).unwrap();
    let third = writer.add_or_update("name", "now a string").unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(writer.root().children().count(), 1);
    assert_eq!(writer.handle(7).map(|n| n.id()), Some(first));
    writer.flush().unwrap();

    let bytes = writer.into_inner();
    let reader = replay(&bytes);
    assert_eq!(reader.root().children().count(), 1);
    let bound = reader.handle(7).unwrap();
    assert_eq!(bound.name(), "name");
    assert_eq!(bound.value(), Some(&Value::from("now a string")));
}

#[test]
fn handle_and_path_edits_rebuild_the_same_tree() {
    let build = |use_handle: bool| {
        let mut writer = Df2Stream::writer(Vec::new()).unwrap();
        let log = record_log(&mut writer);
        let mut table = writer.get_or_add_group("Table").unwrap();
        let length = table.add_or_update("Length", 1u32).unwrap();
        table.add_or_update("Name", "t0").unwrap();
        if use_handle {
            writer.set_handle(length, Some(3)).unwrap();
        }
        writer.get_or_add_group("Other").unwrap().add_or_update("x", 0u8).unwrap();
        writer.update_value(length, 99u32).unwrap();
        writer.flush().unwrap();
        let edited_by_handle = log.borrow().iter().any(|r| r.starts_with("EditValueByHandle"));
        assert_eq!(edited_by_handle, use_handle);
        writer.into_inner()
    };

    let by_path = build(false);
    let by_handle = build(true);
    let (a, b) = (replay(&by_path), replay(&by_handle));
    assert_eq!(a.to_json(), b.to_json());
    assert_eq!(
        b.get("/Table/Length").unwrap().value(),
        Some(&Value::UInt(99))
    );
}

#[test]
fn removed_nodes_stay_gone_after_copy() {
    let mut writer = Df2Stream::writer(Vec::new()).unwrap();
    let mut g = writer.get_or_add_group("g").unwrap();
    g.add_or_update("a", 1u8).unwrap();
    g.add_or_update("b", 2u8).unwrap();
    assert!(g.remove("a").unwrap());
    assert!(!g.remove("a").unwrap());
    writer.flush().unwrap();

    let bytes = writer.into_inner();
    let reader = replay(&bytes);
    assert!(reader.get("/g/a").is_none());

    let mut copy = Df2Stream::writer(Vec::new()).unwrap();
    reader.copy_to(&mut copy).unwrap();
    copy.flush().unwrap();
    let copied = copy.into_inner();
    let again = replay(&copied);
    assert!(again.get("/g/a").is_none());
    assert_eq!(again.get("/g/b").unwrap().value(), Some(&Value::Byte(2)));
}

#[test]
fn copy_preserves_order_and_handles() {
    let mut writer = Df2Stream::writer(Vec::new()).unwrap();
    for name in ["z", "m", "a"] {
        let mut g = writer.get_or_add_group(name).unwrap();
        g.add_or_update("v", name).unwrap();
    }
    let m = writer.get("/m").unwrap().id();
    writer.set_handle(m, Some(5)).unwrap();
    let av = writer.get("/a/v").unwrap().id();
    writer.set_handle(av, Some(6)).unwrap();
    writer.flush().unwrap();

    let bytes = writer.into_inner();
    let reader = replay(&bytes);
    let mut copy = Df2Stream::writer(Vec::new()).unwrap();
    reader.copy_to(&mut copy).unwrap();
    copy.flush().unwrap();
    let copied = copy.into_inner();
    let again = replay(&copied);

    let names: Vec<&str> = again.root().children().map(|n| n.name()).collect();
    assert_eq!(names, ["z", "m", "a"]);
    assert_eq!(again.handle(5).unwrap().absolute_path(), "/m/");
    assert_eq!(again.handle(6).unwrap().absolute_path(), "/a/v");
    assert_eq!(again.to_json(), reader.to_json());
}
