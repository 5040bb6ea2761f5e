#![no_main]

use arbitrary::Arbitrary;
use formstate_doc::{JsonStore, Path, Seg, Store};
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Arbitrary, Debug)]
enum FuzzSeg {
    Key(u8),
    Index(u8),
}

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Set { path: Vec<FuzzSeg>, value: i8 },
    Remove { path: Vec<FuzzSeg> },
    Push { path: Vec<FuzzSeg>, value: i8 },
    Insert { path: Vec<FuzzSeg>, index: u8, value: i8 },
    ArrayRemove { path: Vec<FuzzSeg>, index: u8 },
    Move { path: Vec<FuzzSeg>, from: u8, to: u8 },
}

fn to_path(segs: &[FuzzSeg]) -> Path {
    Path::from_segments(
        segs.iter()
            .take(6)
            .map(|s| match s {
                FuzzSeg::Key(k) => Seg::Key(format!("k{}", k % 4)),
                FuzzSeg::Index(i) => Seg::Index(usize::from(i % 8)),
            })
            .collect(),
    )
}

fn array_len(store: &JsonStore, path: &Path) -> Option<usize> {
    store.get(path).as_ref().and_then(Value::as_array).map(Vec::len)
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let mut store = JsonStore::new(json!({}));
    for op in ops.iter().take(64) {
        let before = store.snapshot();
        match op {
            FuzzOp::Set { path, value } => {
                let path = to_path(path);
                store.set(&path, json!(value));
                assert_eq!(store.get(&path), Some(json!(value)));
            }
            FuzzOp::Remove { path } => {
                let path = to_path(path);
                let len = path.parent().and_then(|p| array_len(&store, &p));
                let _ = store.remove(&path);
                if let Some(len) = len {
                    let parent = path.parent().unwrap_or_default();
                    assert_eq!(array_len(&store, &parent), Some(len));
                }
            }
            FuzzOp::Push { path, value } => {
                let path = to_path(path);
                if let Some(index) = store.array_push(&path, json!(value)) {
                    assert_eq!(array_len(&store, &path), Some(index + 1));
                }
            }
            FuzzOp::Insert { path, index, value } => {
                let path = to_path(path);
                let len = array_len(&store, &path).unwrap_or(0);
                if store
                    .array_insert(&path, usize::from(*index), json!(value))
                    .is_some()
                {
                    assert_eq!(array_len(&store, &path), Some(len + 1));
                }
            }
            FuzzOp::ArrayRemove { path, index } => {
                let path = to_path(path);
                let len = array_len(&store, &path);
                let removed = store.array_remove(&path, usize::from(*index));
                if removed.is_some() {
                    assert_eq!(array_len(&store, &path), len.map(|n| n - 1));
                } else {
                    assert_eq!(store.snapshot(), before);
                }
            }
            FuzzOp::Move { path, from, to } => {
                let path = to_path(path);
                let len = array_len(&store, &path);
                if store.array_move(&path, usize::from(*from), usize::from(*to)) {
                    assert_eq!(array_len(&store, &path), len);
                } else {
                    assert_eq!(store.snapshot(), before);
                }
            }
        }
    }
});
