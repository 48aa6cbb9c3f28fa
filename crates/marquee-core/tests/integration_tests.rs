//! Integration tests for Marquee Core

mod common;

use common::{FakeFactory, FakeFetcher, FakeNative, RecordingBus};
use marquee_core::{
    bus::topics, select, CatalogOptions, Capabilities, DescriptorFetcher, Error, LocalizedText,
    MediaItem, MediaType, Payload, Player, PlayerConfig, Preferences, SourceCatalog, Translator,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn capabilities() -> Arc<Capabilities> {
    Arc::new(Capabilities::new(FakeNative::browser()))
}

fn catalog(options: CatalogOptions) -> SourceCatalog {
    SourceCatalog::new(options, capabilities())
}

fn catalog_with(options: CatalogOptions, fetcher: FakeFetcher) -> SourceCatalog {
    catalog(options).with_fetcher(Arc::new(fetcher))
}

// =============================================================================
// Catalog Tests
// =============================================================================

#[tokio::test]
async fn test_every_shorthand_shape_yields_variants() {
    let shapes = vec![
        json!("https://cdn.example.com/a.mp4"),
        json!({"src": "https://cdn.example.com/a.mp4"}),
        json!({"encodings": ["https://cdn.example.com/a.mkv", "https://cdn.example.com/a.mp4"]}),
        json!({"representations": ["https://cdn.example.com/a.mp4"]}),
        json!({"variants": [{"representations": [{"src": "https://cdn.example.com/a.mp4"}]}]}),
    ];

    for shape in shapes {
        let items = catalog(CatalogOptions::strict()).parse(shape.clone()).await.unwrap();
        assert_eq!(items.len(), 1, "shape {}", shape);
        let rep = &items[0].variants[0].representations[0];
        assert_eq!(rep.src, "https://cdn.example.com/a.mp4", "shape {}", shape);
        assert_eq!(rep.mime_type.as_deref(), Some("video/mp4"));
    }
}

#[tokio::test]
async fn test_invalid_shapes_fail_with_codes() {
    let cases = vec![
        (json!(42), "INVALID_TYPE"),
        (json!({"title": "no media"}), "EMPTY_VARIANTS"),
        (json!({"variants": [{"language": "en"}]}), "EMPTY_REPRESENTATIONS"),
        (json!({"representations": [{"height": 720}]}), "MISSING_SRC"),
        (json!({"src": "https://cdn.example.com/a.mkv"}), "STREAM_NOT_PLAYABLE"),
    ];

    for (input, code) in cases {
        let err = catalog(CatalogOptions::strict()).parse(input.clone()).await.unwrap_err();
        assert_eq!(err.error_code(), code, "input {}", input);
    }
}

#[tokio::test]
async fn test_fetched_descriptor() {
    let fetcher = FakeFetcher::default().with_document(
        "https://api.example.com/item.json",
        json!({
            "title": {"en": "Launch", "de": "Start"},
            "variants": [
                {"language": "en", "default": true, "representations": [
                    {"src": "https://cdn.example.com/en-720.mp4", "height": 720, "bitrate": 2500000},
                    {"src": "https://cdn.example.com/en-1080.mp4", "height": 1080}
                ]},
                {"language": "de", "representations": ["https://cdn.example.com/de.mp4"]}
            ],
            "chapters": [{"title": "Intro", "start": 0, "end": 30}],
            "tracks": [{"src": "https://cdn.example.com/en.vtt", "language": "en"}]
        }),
    );

    let items = catalog_with(CatalogOptions::strict(), fetcher)
        .parse(json!("https://api.example.com/item.json"))
        .await
        .unwrap();
    let item = &items[0];

    assert_eq!(item.title.as_ref().and_then(|t| t.resolve(Some("de"))), Some("Start"));
    assert_eq!(item.languages(), vec!["en", "de"]);
    assert_eq!(item.chapter_at(10.0).map(|c| c.start), Some(0.0));
    assert_eq!(item.tracks.len(), 1);

    let en = &item.variants[0].representations;
    assert_eq!(en[0].quality, Some(720));
    assert_eq!(en[0].bit_rate, Some(2_500_000));
    assert_eq!(en[0].language.as_deref(), Some("en"));
    assert!(en[0].default);
    assert!(!item.variants[1].representations[0].default);
}

#[tokio::test]
async fn test_descriptor_http_status() {
    let fetcher = FakeFetcher::default().with_status("https://api.example.com/gone.json", 410);

    let err = catalog_with(CatalogOptions::lenient(), fetcher)
        .parse(json!("https://api.example.com/gone.json"))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "HTTP_410");
}

#[tokio::test]
async fn test_lenient_parse_keeps_valid_subset() {
    let input = json!([
        "https://cdn.example.com/a.mp4",
        {"src": "https://cdn.example.com/b.mkv"},
        {"variants": [
            {"language": "en", "representations": ["https://cdn.example.com/c.mkv"]},
            {"language": "de", "representations": ["https://cdn.example.com/c.webm"]}
        ]}
    ]);

    let items = catalog(CatalogOptions::lenient()).parse(input).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[1].languages(), vec!["de"]);
}

#[tokio::test]
async fn test_parse_is_idempotent() {
    let input = json!([
        {
            "title": "Clip",
            "variants": [
                {"language": "en", "default": true, "representations": [
                    {"encodings": ["https://cdn.example.com/a.webm", "https://cdn.example.com/a.mp4"], "height": 480},
                    {"src": "https://cdn.example.com/a-720.mp4", "height": 720, "quality": 700}
                ]}
            ],
            "overlays": [{"id": "logo", "start": 1.5, "content": {"text": "Live"}}]
        },
        "https://cdn.example.com/song.mp3",
        "blob:https://app.example.com/4f2a"
    ]);

    let catalog = catalog(CatalogOptions::default());
    let first = catalog.parse(input).await.unwrap();
    let canonical: Value = serde_json::to_value(&first).unwrap();
    let second = catalog.parse(canonical).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[1].variants[0].representations[0].media_type, MediaType::Audio);
}

#[tokio::test]
async fn test_empty_result_is_no_media() {
    let err = catalog(CatalogOptions::lenient()).parse(json!([])).await.unwrap_err();
    assert_eq!(err, Error::NoMedia);
}

// =============================================================================
// Selector Tests
// =============================================================================

async fn ladder() -> MediaItem {
    let input = json!({"variants": [
        {"language": "en", "representations": [
            {"src": "https://cdn.example.com/en-240.mp4", "height": 240},
            {"src": "https://cdn.example.com/en-480.mp4", "height": 480},
            {"src": "https://cdn.example.com/en-720.mp4", "height": 720},
            {"src": "https://cdn.example.com/en-1080.mp4", "height": 1080}
        ]},
        {"language": "de", "representations": [
            {"src": "https://cdn.example.com/de-480.mp4", "height": 480},
            {"src": "https://cdn.example.com/de-720.mp4", "height": 720}
        ]}
    ]});
    catalog(CatalogOptions::strict()).parse(input).await.unwrap().remove(0)
}

#[tokio::test]
async fn test_select_by_viewport() {
    let item = ladder().await;
    let prefs = Preferences::new(None, Some("en"));

    let rep = select(&item, &prefs, 500.0, 1.0).unwrap();
    assert_eq!(rep.src, "https://cdn.example.com/en-480.mp4");
}

#[tokio::test]
async fn test_select_exact_match() {
    let item = ladder().await;
    let prefs = Preferences::new(Some(720), Some("de"));

    let rep = select(&item, &prefs, 200.0, 1.0).unwrap();
    assert_eq!(rep.src, "https://cdn.example.com/de-720.mp4");
}

#[tokio::test]
async fn test_select_quality_without_language() {
    let item = ladder().await;
    let prefs = Preferences::new(Some(480), Some("fr"));

    let rep = select(&item, &prefs, 1000.0, 1.0).unwrap();
    assert_eq!(rep.src, "https://cdn.example.com/en-480.mp4");
}

// =============================================================================
// Player Tests
// =============================================================================

struct Harness {
    player: Player,
    factory: Arc<FakeFactory>,
    bus: Arc<RecordingBus>,
}

fn player(config: PlayerConfig, fetcher: FakeFetcher) -> Harness {
    let factory = FakeFactory::new();
    let bus = RecordingBus::new();
    let fetcher: Arc<dyn DescriptorFetcher> = Arc::new(fetcher);
    let player = Player::new(config, bus.clone(), capabilities(), factory.clone(), Some(fetcher)).unwrap();
    Harness {
        player,
        factory,
        bus,
    }
}

#[tokio::test]
async fn test_set_data_flow() {
    let h = player(PlayerConfig::default(), FakeFetcher::default());
    h.player.set_viewport(500.0, 1.0);

    let outcome = h
        .player
        .set_data(json!({"representations": [
            {"src": "https://cdn.example.com/240.mp4", "height": 240},
            {"src": "https://cdn.example.com/480.mp4", "height": 480},
            {"src": "https://cdn.example.com/1080.mp4", "height": 1080}
        ]}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        h.bus.topics(),
        vec![topics::DATA_PARSED, topics::DATA_READY, topics::DATA_SOURCE]
    );
    assert_eq!(
        h.factory.current().state().src.as_deref(),
        Some("https://cdn.example.com/480.mp4")
    );
    // the element is recreated for the selected item
    assert_eq!(h.factory.created(), 2);
    assert!(outcome.try_result().is_none());
}

#[tokio::test]
async fn test_set_data_error() {
    let h = player(PlayerConfig::default(), FakeFetcher::default());

    let err = h.player.set_data(json!({"title": "nothing"})).await.unwrap_err();

    assert_eq!(err, Error::EmptyVariants);
    assert_eq!(
        h.bus.payloads(topics::DATA_ERROR),
        vec![Payload::DataError {
            code: "EMPTY_VARIANTS".into(),
            message: "EMPTY_VARIANTS".into(),
        }]
    );
    assert_eq!(h.bus.count(topics::DATA_NOMEDIA), 0);
}

#[tokio::test]
async fn test_set_data_no_media() {
    let config = PlayerConfig {
        skip_invalid_items: true,
        ..PlayerConfig::default()
    };
    let h = player(config, FakeFetcher::default());

    let err = h.player.set_data(json!([{"src": "https://cdn.example.com/a.mkv"}])).await.unwrap_err();

    assert_eq!(err, Error::NoMedia);
    assert_eq!(h.bus.count(topics::DATA_ERROR), 1);
    assert_eq!(h.bus.count(topics::DATA_NOMEDIA), 1);
}

#[tokio::test]
async fn test_skip_empty_data() {
    let config = PlayerConfig {
        skip_empty_data: true,
        ..PlayerConfig::default()
    };
    let h = player(config, FakeFetcher::default());

    let outcome = h.player.set_data(json!([])).await.unwrap();

    assert!(outcome.is_none());
    assert_eq!(h.bus.topics(), vec![topics::DATA_PARSED, topics::DATA_NOMEDIA]);
}

#[tokio::test]
async fn test_preference_change_reloads() {
    let config = PlayerConfig {
        preferred_language: Some("en".into()),
        ..PlayerConfig::default()
    };
    let h = player(config, FakeFetcher::default());
    h.player
        .set_data(json!({"variants": [
            {"language": "en", "representations": ["https://cdn.example.com/en.mp4"]},
            {"language": "de", "representations": ["https://cdn.example.com/de.mp4"]}
        ]}))
        .await
        .unwrap();
    assert_eq!(h.player.session().metadata().unwrap().src, "https://cdn.example.com/en.mp4");

    assert!(h.player.set_preferences(None, Some("en".into())).await.is_none());

    let outcome = h.player.set_preferences(None, Some("de".into())).await;
    assert!(outcome.is_some());
    assert_eq!(h.player.session().metadata().unwrap().src, "https://cdn.example.com/de.mp4");
    assert_eq!(h.factory.created(), 2);
}

struct Catalogue;

impl Translator for Catalogue {
    fn translate(&self, key: &str, vars: &HashMap<String, String>) -> Option<String> {
        match key {
            "NO_MEDIA" => Some(format!("Nothing to play ({})", vars.get("detail")?)),
            _ => None,
        }
    }
}

#[test]
fn test_translated_messages() {
    let h = player(PlayerConfig::default(), FakeFetcher::default());
    let player = h.player.with_translator(Arc::new(Catalogue));

    assert_eq!(
        player.message_for(&Error::NoMedia),
        "Nothing to play (No playable media in descriptor)"
    );
    assert_eq!(player.message_for(&Error::MissingSrc), "MISSING_SRC");
}

#[test]
fn test_localized_title_roundtrip() {
    let title: LocalizedText = serde_json::from_value(json!({"en": "Hello"})).unwrap();
    assert_eq!(title.resolve(None), Some("Hello"));
}
