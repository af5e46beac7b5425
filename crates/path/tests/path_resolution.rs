use df2_path::{relative_to, resolve_absolute, shortest_reference, PathError};
use proptest::prelude::*;

const CASES: &[(&str, &str, &str)] = &[
    (
        "/RootData/Tables/Table0/DataStorage/",
        "/RootData/Tables/Table0/DataStorage/LongData",
        "LongData",
    ),
    (
        "/RootData/Tables/",
        "/RootData/Tables/Table0/DataStorage/LongData",
        "Table0/DataStorage/LongData",
    ),
    (
        "/RootData/Tables/Table0/DataStorage/",
        "/RootData/Tables/Table0/DataLength",
        "../DataLength",
    ),
    (
        "/RootData/Tables/Table0/DataStorage/",
        "/RootData/NumTables",
        "../../../NumTables",
    ),
    (
        "/RootData/Tables/Table0/DataStorage/",
        "/SomeOtherData/IntData",
        "../../../../SomeOtherData/IntData",
    ),
];

#[test]
fn produces_relative_paths() {
    for (current, dest, expected) in CASES {
        assert_eq!(relative_to(dest, current).unwrap(), *expected, "{current} -> {dest}");
    }
}

#[test]
fn produces_full_paths() {
    for (current, dest, relative) in CASES {
        assert_eq!(resolve_absolute(relative, current).unwrap(), *dest, "{current} + {relative}");
    }
}

#[test]
fn shortest_reference_prefers_absolute_when_shorter() {
    assert_eq!(
        shortest_reference("/SomeOtherData/IntData", "/RootData/Tables/Table0/DataStorage/").unwrap(),
        "/SomeOtherData/IntData"
    );
    assert_eq!(
        shortest_reference("/RootData/Tables/Table0/DataLength", "/RootData/Tables/Table0/DataStorage/")
            .unwrap(),
        "../DataLength"
    );
}

#[test]
fn relative_to_rejects_parent_segments() {
    assert!(matches!(
        relative_to("/a/../b", "/"),
        Err(PathError::ParentSegment(_))
    ));
    assert!(matches!(relative_to("/a", "b"), Err(PathError::NotAbsolute(_))));
}

fn absolute_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-c]{1,2}", 0..5),
        any::<bool>(),
    )
        .prop_map(|(parts, trailing)| {
            let mut path = df2_path::join(&parts);
            if trailing && !parts.is_empty() {
                path.push('/');
            }
            path
        })
}

proptest! {
    #[test]
    fn resolve_inverts_relative(target in absolute_path(), base in absolute_path()) {
        let relative = relative_to(&target, &base).unwrap();
        let normalized = resolve_absolute(&target, "/").unwrap();
        prop_assert_eq!(resolve_absolute(&relative, &base).unwrap(), normalized.clone());

        let shortest = shortest_reference(&target, &base).unwrap();
        prop_assert!(!shortest.is_empty());
        prop_assert_eq!(resolve_absolute(&shortest, &base).unwrap(), normalized);
    }
}
