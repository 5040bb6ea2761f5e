#![no_main]

use arbitrary::Arbitrary;
use formstate_core::{Form, FormConfig};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Arbitrary, Debug)]
enum Edit {
    Insert(u8),
    Remove(u8),
    Move(u8, u8),
    Touch(u8),
}

fuzz_target!(|input: (u8, Vec<Edit>)| {
    let (len, edits) = input;
    let len = usize::from(len % 8);
    let items: Vec<usize> = (0..len).collect();
    let form = Form::builder()
        .initial(json!({ "items": items }))
        .config(FormConfig::default().with_validate_on_array_edit(false))
        .build();
    let rows: Vec<_> = (0..len).map(|i| form.field(format!("items.{i}"))).collect();

    for edit in edits.iter().take(32) {
        match *edit {
            Edit::Insert(at) => {
                let _ = form.array_insert("items", usize::from(at % 10), json!(-1));
            }
            Edit::Remove(at) => {
                let _ = form.array_remove("items", usize::from(at % 10));
            }
            Edit::Move(from, to) => {
                let _ = form.array_move("items", usize::from(from % 10), usize::from(to % 10));
            }
            Edit::Touch(at) => form.touch(format!("items.{}", at % 10)),
        }
    }

    for row in &rows {
        if form.has_field(row.path()) && form.field(row.path()).same_as(row) {
            assert_eq!(row.value(), form.get_value(row.path()));
        }
    }
});
