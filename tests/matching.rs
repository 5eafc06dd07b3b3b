//! Category matching properties over the bundled corpus.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;

use homefix_router::search::{parse_corpus, CorpusRow};
use homefix_router::{
    Embedder, EmbeddingService, HashingEmbedder, Matcher, MatcherConfig, TaxonomyIndex,
};

const TEST_DIMENSION: usize = 4096;

fn build_matcher(rows: Vec<CorpusRow>) -> Matcher {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(TEST_DIMENSION));
    let index = TaxonomyIndex::from_rows(rows, embedder.as_ref()).unwrap();
    Matcher::new(Arc::new(index), embedder, MatcherConfig::default()).unwrap()
}

fn corpus_rows() -> Vec<CorpusRow> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/service_intents.csv");
    let content = std::fs::read_to_string(path).unwrap();
    parse_corpus(&content).unwrap()
}

fn corpus_matcher() -> Matcher {
    build_matcher(corpus_rows())
}

fn random_query(rng: &mut StdRng) -> String {
    (0..3)
        .map(|_| {
            let len = rng.gen_range(6..10);
            (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn test_category_is_always_known() {
    let matcher = corpus_matcher();
    let mut rng = StdRng::seed_from_u64(42);

    let queries = [
        "leaking pipe".to_string(),
        "my fridge is warm".to_string(),
        "someone broke the window glass".to_string(),
        random_query(&mut rng),
        random_query(&mut rng),
    ];

    for query in &queries {
        let result = matcher.match_query(query).unwrap();
        assert!(
            matcher.index().contains_category(&result.category)
                || result.category == matcher.config().fallback_category,
            "unexpected category {} for {:?}",
            result.category,
            query
        );
    }
}

#[test]
fn test_random_tokens_fall_back() {
    let matcher = corpus_matcher();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..25 {
        let query = random_query(&mut rng);
        let result = matcher.match_query(&query).unwrap();
        assert_eq!(result.category, "general_contractor", "query {:?}", query);
        assert!(!result.matched);
        assert!(result.confidence.is_none());
    }
}

#[test]
fn test_identical_queries_are_deterministic() {
    let matcher = corpus_matcher();
    let first = matcher.match_query("circuit breaker keeps tripping").unwrap();
    for _ in 0..5 {
        assert_eq!(
            matcher.match_query("circuit breaker keeps tripping").unwrap(),
            first
        );
    }
    assert_eq!(first.category, "electrician");
}

#[test]
fn test_case_and_whitespace_do_not_matter() {
    let matcher = corpus_matcher();
    let a = matcher.match_query("Leaking Pipe").unwrap();
    let b = matcher.match_query("leaking pipe").unwrap();
    let c = matcher.match_query("   leaking pipe \t").unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.category, "plumber");
    assert_eq!(a.matched_text.as_deref(), Some("leaking pipe"));
}

#[test]
fn test_tied_entries_prefer_corpus_order() {
    let matcher = build_matcher(vec![
        CorpusRow::new("cracked tiles", "specialized_services"),
        CorpusRow::new("cracked tiles", "general_contractor"),
        CorpusRow::new("rusty gate", "welder"),
    ]);

    let result = matcher.match_query("cracked tiles").unwrap();
    assert_eq!(result.category, "specialized_services");
    assert!(result.matched);
}

#[test]
fn test_threshold_is_inclusive() {
    let matcher = build_matcher(vec![
        CorpusRow::new("leaking pipe", "plumber"),
        CorpusRow::new("sparking socket", "electrician"),
    ]);

    let at = matcher.select(&[0.55, 0.1]);
    assert!(at.matched);
    assert_eq!(at.category, "plumber");

    let below = matcher.select(&[0.549_999, 0.1]);
    assert!(!below.matched);
    assert_eq!(below.category, "general_contractor");
}

#[test]
#[ignore = "downloads the all-MiniLM-L6-v2 model"]
fn test_default_model_routes_leaking_pipe_to_plumber() {
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingService::new().unwrap());
    let index = TaxonomyIndex::from_rows(corpus_rows(), embedder.as_ref()).unwrap();
    let matcher = Matcher::new(Arc::new(index), embedder, MatcherConfig::default()).unwrap();

    let result = matcher
        .match_query("water is leaking from my kitchen pipe")
        .unwrap();
    assert_eq!(result.category, "plumber");
    assert!(result.matched);
    assert!(result.confidence.unwrap() >= 0.55);
}
