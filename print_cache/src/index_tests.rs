//! Tests for the index builder

use super::PrintIndex;
use crate::fixtures::{make_faced_print, make_test_print};

fn sample_index() -> PrintIndex {
    PrintIndex::build(vec![
        make_test_print("a", "bolt", "Lightning Bolt", "LEA", "161"),
        make_test_print("b", "bolt", "Lightning Bolt", "m10", "146"),
        make_test_print("c", "pridemate", "Ajani's Pridemate", "m10", "1"),
        make_test_print("d", "arch", "Archangel", "sld", "007a"),
        make_faced_print(
            "e",
            "ojer",
            "Ojer Axonil, Deepest Might // Temple of Power",
            "lci",
            "158",
            "transform",
        ),
        make_test_print("f", "", "Art Card", "alci", "★1"),
    ])
}

#[test]
fn indexes_set_and_number_lowercased() {
    let index = sample_index();
    let pos = index.by_set_and_number["lea::161"];
    assert_eq!(index.at(pos).id, "a");
    assert!(index.by_set_and_number.contains_key("sld::007a"));
    assert!(index.by_set_and_number.contains_key("alci::★1"));
}

#[test]
fn duplicate_set_number_keeps_last_record() {
    let index = PrintIndex::build(vec![
        make_test_print("a", "x", "One", "abc", "1"),
        make_test_print("b", "y", "Two", "abc", "1"),
    ]);
    assert_eq!(index.at(index.by_set_and_number["abc::1"]).id, "b");
    assert_eq!(index.len(), 2);
}

#[test]
fn groups_by_oracle_in_append_order() {
    let index = sample_index();
    let ids: Vec<_> = index.by_oracle["bolt"]
        .iter()
        .map(|&p| index.at(p).id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    // Prints without an oracle id are not grouped
    assert_eq!(index.oracle_count(), 4);
}

#[test]
fn numeric_index_uses_leading_digits() {
    let index = sample_index();
    let hits = &index.by_set_and_numeric_number[&("sld".to_string(), 7)];
    assert_eq!(index.at(hits[0]).id, "d");
    assert!(!index
        .by_set_and_numeric_number
        .keys()
        .any(|(set, _)| set == "alci"));
}

#[test]
fn name_indexes_cover_faces() {
    let index = sample_index();
    assert_eq!(index.by_full_name["ajanispridemate"].len(), 1);
    assert_eq!(
        index.by_full_name["ojeraxonildeepestmighttempleofpower"].len(),
        1
    );
    assert_eq!(index.by_front_face_name["ojeraxonildeepestmight"].len(), 1);
    assert_eq!(index.by_back_face_name["templeofpower"].len(), 1);
    // Single-faced cards index their plain name as the front face
    assert_eq!(index.by_front_face_name["lightningbolt"].len(), 2);
}

#[test]
fn sizes_report_every_index() {
    let sizes = sample_index().sizes();
    assert_eq!(sizes.by_id, 6);
    assert_eq!(sizes.by_set_and_number, 6);
    assert_eq!(sizes.by_back_face_name, 1);
}

#[test]
fn empty_store_builds_empty_indexes() {
    let index = PrintIndex::build(Vec::new());
    assert!(index.is_empty());
    assert_eq!(index.sizes(), Default::default());
}
