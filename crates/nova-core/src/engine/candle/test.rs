use super::*;
use crate::engine::{GenerationError, Generator, SamplingParams};
use crate::resolver::Resolver;
use std::path::PathBuf;
use std::sync::Arc;

#[test]
fn missing_model_dir_reports_location() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../testdata/no-such-model");
    let err = match CandleGpt2Generator::load(&ModelSource::Dir(dir.clone())) {
        Ok(_) => panic!("loading a missing directory should fail"),
        Err(e) => e,
    };
    match err {
        GenerationError::LoadModel { location, .. } => {
            assert_eq!(location, dir.display().to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn hub_source_displays_as_url() {
    let source = ModelSource::Hub {
        repo: "openai-community/gpt2".into(),
    };
    assert_eq!(source.to_string(), "hf://openai-community/gpt2");
}

#[test]
fn long_prompt_keeps_its_head() {
    let ids: Vec<u32> = (0..600).collect();
    let kept = generator::truncate_prompt(ids, 512, 1024);
    assert_eq!(kept.len(), 512);
    assert_eq!(kept.first(), Some(&0));
    assert_eq!(kept.last(), Some(&511));
}

#[test]
fn prompt_leaves_room_for_one_generated_token() {
    let kept = generator::truncate_prompt((0..40).collect(), 512, 32);
    assert_eq!(kept, (0..31).collect::<Vec<u32>>());
}

#[test]
fn short_prompt_is_untouched() {
    let kept = generator::truncate_prompt(vec![5, 6, 7], 512, 1024);
    assert_eq!(kept, [5, 6, 7]);
}

/// Download the stock GPT-2 checkpoint (~550 MB) and run one short generation.
#[test]
#[ignore = "downloads gpt2 weights from the Hugging Face Hub"]
fn gpt2_generates_continuation() {
    let generator = CandleGpt2Generator::load(&ModelSource::Hub {
        repo: "openai-community/gpt2".into(),
    })
    .expect("failed to load gpt2");

    let params = SamplingParams {
        max_new_tokens: 16,
        seed: Some(42),
        ..SamplingParams::default()
    };
    let text = generator
        .generate("Hello, my name is", &params)
        .expect("generation failed");

    println!("Generated: {text}");
    assert!(text.starts_with("Hello, my name is"));
    assert!(text.len() > "Hello, my name is".len());

    let resolver = Resolver::new(Arc::new(generator)).with_params(params);
    let answer = resolver
        .resolve("How should I prepare for my annual review?")
        .expect("resolve failed")
        .answer;
    println!("Answer: {answer}");
    assert!(answer.ends_with(['.', '!', '?']));
}
