//! Print builders shared by the unit tests

use mtg_common::{CardFace, PrintRecord};

/// Create a test print with default values
pub fn make_test_print(id: &str, oracle_id: &str, name: &str, set: &str, cn: &str) -> PrintRecord {
    PrintRecord {
        id: id.to_string(),
        oracle_id: Some(oracle_id.to_string()).filter(|o| !o.is_empty()),
        name: name.to_string(),
        set_code: set.to_string(),
        collector_number: cn.to_string(),
        layout: Some("normal".to_string()),
        set_type: Some("expansion".to_string()),
        lang: Some("en".to_string()),
        released_at: Some("2020-01-01".to_string()),
        ..Default::default()
    }
}

/// Create a test print whose name is split into faces on `" // "`
pub fn make_faced_print(
    id: &str,
    oracle_id: &str,
    name: &str,
    set: &str,
    cn: &str,
    layout: &str,
) -> PrintRecord {
    let faces = name
        .split(" // ")
        .map(|face| CardFace {
            name: face.to_string(),
            ..Default::default()
        })
        .collect();
    PrintRecord {
        layout: Some(layout.to_string()),
        card_faces: Some(faces),
        ..make_test_print(id, oracle_id, name, set, cn)
    }
}
