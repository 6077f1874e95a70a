//! Optimizer behavior against an in-memory cache.

mod common;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use codectune_core::{
    Cache, Encoder, Encoding, EncodingMemoryCache, EncodingResult, FileAndRateSet, Optimizer,
};

use common::{other_videofile, test_videofile, DummyCodec};

fn std_optimizer(codec: &Arc<DummyCodec>) -> Optimizer {
    Optimizer::new(codec.clone(), Box::new(EncodingMemoryCache::new())).with_seed(42)
}

fn encoder_from(codec: &Arc<DummyCodec>, parameters: &str) -> Encoder {
    Encoder::new(codec.clone(), codec.parse(parameters).expect("parameters parse"))
}

fn execute_and_store(encoding: &mut Encoding, cache: &dyn Cache) {
    encoding.execute(Path::new("unused")).expect("dummy execute");
    encoding.store(cache).expect("store succeeds");
}

#[test]
fn test_first_best_encoding_has_no_result() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);
    let encoding = optimizer.best_encoding(100, &test_videofile()).unwrap();
    assert!(encoding.result().is_none());
    assert_eq!(encoding.encoder().parameters().to_string(), "--score=5");
}

#[test]
fn test_best_encoding_execute_gives_score() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);
    let mut encoding = optimizer.best_encoding(100, &test_videofile()).unwrap();
    execute_and_store(&mut encoding, optimizer.cache());

    let best = optimizer.best_encoding(100, &test_videofile()).unwrap();
    let score = optimizer.score_encoding(&best).expect("scored");
    assert!((score - 5.0).abs() < 1e-4);
}

#[test]
fn test_alternate_scorer() {
    fn returns_one(_bitrate: u32, _result: &EncodingResult) -> Option<f64> {
        Some(1.0)
    }

    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec).with_score_function(returns_one);
    let mut encoding = optimizer.best_encoding(100, &test_videofile()).unwrap();
    execute_and_store(&mut encoding, optimizer.cache());

    let best = optimizer.best_encoding(100, &test_videofile()).unwrap();
    let score = optimizer.score_encoding(&best).expect("scored");
    assert!((score - 1.0).abs() < 1e-4);
}

#[test]
fn test_best_encoding_other_rate_has_no_result() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);
    let mut encoding = optimizer.best_encoding(100, &test_videofile()).unwrap();
    execute_and_store(&mut encoding, optimizer.cache());

    let other = optimizer.best_encoding(200, &test_videofile()).unwrap();
    assert!(other.result().is_none());
}

#[test]
fn test_shorter_parameter_lists_score_higher() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);

    let mut short = encoder_from(&codec, "--score=5").encoding(100, test_videofile());
    short.execute(Path::new("unused")).unwrap();
    let mut long =
        encoder_from(&codec, "--score=5 --another_parameter=yes").encoding(100, test_videofile());
    long.execute(Path::new("unused")).unwrap();

    let short_score = optimizer.score_encoding(&short).unwrap();
    let long_score = optimizer.score_encoding(&long).unwrap();
    assert!(short_score > long_score);
}

#[test]
fn test_best_untried_encoding_returns_something_different() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);
    let mut first = optimizer.best_encoding(100, &test_videofile()).unwrap();
    execute_and_store(&mut first, optimizer.cache());

    let untried = optimizer
        .best_untried_encoding(100, &test_videofile(), &HashSet::new())
        .unwrap()
        .expect("an untried configuration exists");
    assert!(untried.result().is_none());
    assert_ne!(
        untried.encoder().parameters().to_string(),
        first.encoder().parameters().to_string()
    );
}

#[test]
fn test_configuration_good_on_another_clip_is_proposed() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);

    // On the other clip, score=10 beats score=5. On this clip only
    // score=5 has been measured, so score=10 is worth trying here.
    let low = encoder_from(&codec, "--score=5");
    let high = encoder_from(&codec, "--score=10");
    execute_and_store(&mut low.encoding(100, other_videofile()), optimizer.cache());
    execute_and_store(&mut high.encoding(100, other_videofile()), optimizer.cache());
    execute_and_store(&mut low.encoding(100, test_videofile()), optimizer.cache());

    let untried = optimizer
        .best_untried_encoding(100, &test_videofile(), &HashSet::new())
        .unwrap()
        .expect("transplant candidate exists");
    assert_eq!(untried.videofile(), &test_videofile());
    assert_eq!(untried.encoder().parameters().to_string(), "--score=10");
}

#[test]
fn test_removing_a_parameter_is_proposed() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec);
    let encoder = encoder_from(&codec, "--score=5 --another_parameter=yes");
    execute_and_store(&mut encoder.encoding(100, test_videofile()), optimizer.cache());

    let untried = optimizer
        .best_untried_encoding(100, &test_videofile(), &HashSet::new())
        .unwrap()
        .expect("reduced candidate exists");
    assert!(untried.result().is_none());
    assert_eq!(untried.encoder().parameters().assigned_len(), 1);
}

#[test]
fn test_configuration_good_on_other_rate_is_proposed() {
    let codec = Arc::new(DummyCodec::new());
    let mut file_set = FileAndRateSet::new(false);
    file_set.add_files_and_rates(&[test_videofile().filename()], &[100, 200], None);
    let optimizer = std_optimizer(&codec).with_file_set(file_set);

    execute_and_store(
        &mut encoder_from(&codec, "--score=7").encoding(100, test_videofile()),
        optimizer.cache(),
    );
    execute_and_store(
        &mut encoder_from(&codec, "--score=8").encoding(200, test_videofile()),
        optimizer.cache(),
    );

    let untried = optimizer
        .best_untried_encoding(200, &test_videofile(), &HashSet::new())
        .unwrap()
        .expect("cross-rate candidate exists");
    assert_eq!(untried.bitrate(), 200);
    assert_eq!(untried.encoder().parameters().to_string(), "--score=7");
}

#[test]
fn test_best_overall_encoder() {
    let codec = Arc::new(DummyCodec::new());
    let mut file_set = FileAndRateSet::new(false);
    file_set.add_files_and_rates(&[test_videofile().filename()], &[100, 200], None);
    let optimizer = std_optimizer(&codec).with_file_set(file_set.clone());

    // Nothing measured yet.
    assert!(optimizer.best_overall_encoder().unwrap().is_none());

    // One encoder measured on the complete set.
    let complete = encoder_from(&codec, "--score=7");
    for (rate, _) in file_set.all_files_and_rates() {
        execute_and_store(
            &mut complete.encoding(*rate, test_videofile()),
            optimizer.cache(),
        );
    }
    let best = optimizer.best_overall_encoder().unwrap().expect("a candidate");
    assert_eq!(best.parameters().to_string(), "--score=7");

    // A higher-scoring but incomplete encoder is ignored.
    let partial = encoder_from(&codec, "--score=9");
    execute_and_store(&mut partial.encoding(100, test_videofile()), optimizer.cache());
    let best = optimizer.best_overall_encoder().unwrap().expect("a candidate");
    assert_eq!(best.parameters().to_string(), "--score=7");

    // Completing its set makes it win.
    execute_and_store(&mut partial.encoding(200, test_videofile()), optimizer.cache());
    let best = optimizer.best_overall_encoder().unwrap().expect("a candidate");
    assert_eq!(best.parameters().to_string(), "--score=9");
}

#[test]
fn test_search_loop_improves_and_terminates() {
    let codec = Arc::new(DummyCodec::new());
    let optimizer = std_optimizer(&codec).with_seed(7);
    let mut start = optimizer.best_encoding(100, &test_videofile()).unwrap();
    execute_and_store(&mut start, optimizer.cache());
    let start_score = optimizer.score_encoding(&start).unwrap();

    // Every proposal is untried, and the configuration space is finite,
    // so the loop must reach None.
    let mut iterations = 0;
    while let Some(mut encoding) = optimizer
        .best_untried_encoding(100, &test_videofile(), &HashSet::new())
        .unwrap()
    {
        execute_and_store(&mut encoding, optimizer.cache());
        iterations += 1;
        assert!(iterations <= 50, "search failed to terminate");
    }

    let best = optimizer.best_encoding(100, &test_videofile()).unwrap();
    let best_score = optimizer.score_encoding(&best).unwrap();
    assert!(best.result().is_some());
    assert!(best_score >= start_score);
}
