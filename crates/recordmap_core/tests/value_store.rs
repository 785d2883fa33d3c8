mod common;

use common::{row, sqlite_storage, User};
use recordmap_core::{Entity, FieldMap, Manager, Value};

fn users() -> Manager<User> {
    Manager::new(sqlite_storage()).unwrap()
}

#[test]
fn writes_shadow_baseline_until_reset() {
    let manager = users();
    let mut user = manager.fresh(
        row(&[("id", Value::from(1)), ("name", Value::from("ada"))]),
        false,
    );
    assert!(!user.record().is_dirty());

    user.set_name("lovelace");
    assert_eq!(user.name(), Some("lovelace"));
    assert_eq!(user.record().dirty_fields().len(), 1);

    let snapshot = user.record().current_snapshot();
    assert_eq!(snapshot.get("name"), Some(&Value::from("lovelace")));
    assert_eq!(snapshot.get("email"), Some(&Value::Null));

    let mut confirmed = FieldMap::new();
    confirmed.insert("id".to_string(), Value::from(1));
    confirmed.insert("name".to_string(), Value::from("confirmed"));
    user.record_mut().reset(confirmed, false);
    assert!(!user.record().is_dirty());
    assert_eq!(user.name(), Some("confirmed"));
}

#[test]
fn unset_drops_only_the_pending_write() {
    let manager = users();
    let mut user = manager.fresh(row(&[("name", Value::from("ada"))]), false);
    user.set_name("grace");
    user.record_mut().unset("name");

    assert_eq!(user.name(), Some("ada"));
    assert!(!user.record().is_dirty());
}

#[test]
fn unknown_names_go_to_the_container() {
    let manager = users();
    let mut user = manager.fresh(
        row(&[
            ("id", Value::from(1)),
            ("name", Value::from("a")),
            ("extra", Value::from(true)),
        ]),
        true,
    );

    // Every schema field resolves, plus the one container entry.
    assert_eq!(user.record().count(), 4);
    assert_eq!(user.record().get("extra"), &Value::Integer(1));
    assert!(!user.record().dirty_fields().contains_key("extra"));

    user.record_mut().set("scratch", "x");
    assert_eq!(user.record().store().container().len(), 2);
    assert!(user.record().get("missing").is_null());
}

#[test]
fn reset_can_clear_or_keep_the_container() {
    let manager = users();
    let mut user = manager.fresh(row(&[("note", Value::from("keep"))]), false);

    user.record_mut().reset(FieldMap::new(), false);
    assert_eq!(user.record().get("note"), &Value::from("keep"));

    user.record_mut().reset(FieldMap::new(), true);
    assert!(user.record().get("note").is_null());
    assert_eq!(user.record().count(), 3);
}

#[test]
fn json_input_classifies_like_pairs() {
    let manager = users();
    let user = manager
        .fresh_json(
            &serde_json::json!({"id": 3, "name": "alan", "score": 1.5, "email": null}),
            true,
        )
        .unwrap();

    assert_eq!(user.id(), Some(3));
    assert!(user.email().is_none());
    assert_eq!(user.record().get("score"), &Value::Real(1.5));
    assert_eq!(user.record().dirty_fields().len(), 3);
}
