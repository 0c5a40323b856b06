use std::time::Duration;

use story_engine::story::{DEFAULT_AUTHOR_NAME, DEFAULT_AVATAR_URL};
use story_engine::{Catalog, CatalogError, PlaybackConfig};

const STORIES_JSON: &str = r#"{
  "stories": [
    {
      "id": "1",
      "image": "https://picsum.photos/400/700?random=1",
      "duration": 5000,
      "user": { "name": "adventure_seeker", "avatar": "https://picsum.photos/64/64?random=11" }
    },
    { "id": "2", "image": "https://picsum.photos/400/700?random=2", "user": { "name": "food_lover" } },
    { "id": "3", "image": "https://picsum.photos/400/700?random=3", "duration": 0 },
    { "id": "4", "image": "https://picsum.photos/400/700?random=4", "duration": "soon" },
    { "id": "5", "mediaUrl": "https://picsum.photos/400/700?random=5", "durationMs": 250 }
  ]
}"#;

#[test]
fn parses_wrapped_catalog_document() {
    let catalog = Catalog::from_json(STORIES_JSON, &PlaybackConfig::default())
        .expect("catalog document should parse");
    assert_eq!(catalog.len(), 5);

    let first = catalog.get(0).expect("first story");
    assert_eq!(first.id, "1");
    assert_eq!(first.duration, Duration::from_millis(5_000));
    assert_eq!(first.display_name(), "adventure_seeker");
    assert_eq!(first.display_avatar(), "https://picsum.photos/64/64?random=11");

    let second = catalog.get(1).expect("second story");
    assert_eq!(second.display_avatar(), DEFAULT_AVATAR_URL);

    let third = catalog.get(2).expect("third story");
    assert_eq!(third.display_name(), DEFAULT_AUTHOR_NAME);
}

#[test]
fn unusable_durations_fall_back_and_short_ones_clamp() {
    let cfg = PlaybackConfig::default();
    let catalog = Catalog::from_json(STORIES_JSON, &cfg).expect("catalog document should parse");

    assert_eq!(catalog.get(1).unwrap().duration, cfg.default_story_duration);
    assert_eq!(catalog.get(2).unwrap().duration, cfg.default_story_duration);
    assert_eq!(catalog.get(3).unwrap().duration, cfg.default_story_duration);
    assert_eq!(catalog.get(4).unwrap().duration, cfg.min_story_duration);
    assert_eq!(
        catalog.get(4).unwrap().media_url,
        "https://picsum.photos/400/700?random=5"
    );
}

#[test]
fn bare_array_is_accepted() {
    let catalog = Catalog::from_json(
        r#"[{"id":"a","image":"/a.jpg"},{"id":"b","image":"/b.jpg","duration":2500}]"#,
        &PlaybackConfig::default(),
    )
    .expect("bare array should parse");
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get(1).unwrap().duration, Duration::from_millis(2_500));
}

#[test]
fn empty_and_malformed_documents_fail_fast() {
    let cfg = PlaybackConfig::default();
    assert_eq!(
        Catalog::from_json(r#"{"stories":[]}"#, &cfg),
        Err(CatalogError::Empty)
    );
    assert!(matches!(
        Catalog::from_json(r#"{"stories":[{"id":"x"}]}"#, &cfg),
        Err(CatalogError::Malformed(_))
    ));
    assert!(matches!(
        Catalog::from_json("not json", &cfg),
        Err(CatalogError::Malformed(_))
    ));
}

#[test]
fn normalized_items_serialize_with_millisecond_durations() {
    let catalog = Catalog::from_json(STORIES_JSON, &PlaybackConfig::default())
        .expect("catalog document should parse");
    let value = serde_json::to_value(catalog.get(0).unwrap()).expect("serialize story");
    assert_eq!(value["durationMs"], 5000);
    assert_eq!(value["mediaUrl"], "https://picsum.photos/400/700?random=1");
    assert_eq!(value["authorName"], "adventure_seeker");
}
