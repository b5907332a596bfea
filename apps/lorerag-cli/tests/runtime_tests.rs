use std::path::Path;

use lorerag_cli::Runtime;
use lorerag_core::config::Config;

fn settings_for(lore_dir: &Path) -> lorerag_core::config::Settings {
    let toml = format!(
        r#"
        [lore]
        dir = "{}"
        max_words = 4

        [retrieval]
        top_k = 2
        metric = "cosine"

        [models]
        use_fake_embeddings = true
        fake_dim = 64
        llm_dir = "/nonexistent/lorerag-llm"
        caption_dir = "/nonexistent/lorerag-blip"
        "#,
        lore_dir.display()
    );
    Config::from_toml_str(&toml).unwrap().settings().unwrap()
}

#[test]
fn runtime_builds_index_without_loading_generators() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("city.txt"),
        "the harbor district never sleeps under neon",
    )
    .unwrap();
    let runtime = Runtime::from_settings(settings_for(tmp.path())).unwrap();

    assert_eq!(runtime.lore_dir(None), tmp.path());
    assert_eq!(runtime.top_k(None), 2);
    assert_eq!(runtime.top_k(Some(5)), 5);

    let report = runtime.library().build(&runtime.lore_dir(None)).unwrap();
    assert_eq!(
        (report.documents, report.chunks, report.dim),
        (1, 2, Some(64))
    );

    let hits = runtime
        .library()
        .retriever()
        .retrieve("neon harbor", 10)
        .unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn missing_language_model_is_an_initialization_error() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = Runtime::from_settings(settings_for(tmp.path())).unwrap();
    runtime.library().build(tmp.path()).unwrap();

    let enricher = runtime.enricher(3);
    for _ in 0..2 {
        let err = enricher.enrich("a detective on a rooftop").unwrap_err();
        assert!(err.is_initialization(), "{err}");
        assert!(err.to_string().contains("phi-2"), "{err}");
    }
}

#[test]
fn missing_caption_model_fails_story() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = Runtime::from_settings(settings_for(tmp.path())).unwrap();
    let err = runtime
        .composer(3)
        .compose(Path::new("photo.png"))
        .unwrap_err();
    assert!(err.is_initialization(), "{err}");
}

#[test]
fn output_overrides_win_over_settings() {
    let tmp = tempfile::tempdir().unwrap();
    let runtime = Runtime::from_settings(settings_for(tmp.path())).unwrap();
    assert_eq!(runtime.images_dir(None), Path::new("outputs/images"));
    assert_eq!(
        runtime.stories_dir(Some(Path::new("/tmp/s"))),
        Path::new("/tmp/s")
    );
}

#[test]
fn relative_paths_follow_the_config_dir() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        "[lore]\ndir = \"lore\"\n\n\
         [models]\nuse_fake_embeddings = true\nfake_dim = 32\n\n\
         [output]\nstories_dir = \"out/stories\"\n",
    )
    .unwrap();
    std::fs::create_dir(tmp.path().join("lore")).unwrap();
    std::fs::write(
        tmp.path().join("lore").join("vale.txt"),
        "inspector vale walks the docks",
    )
    .unwrap();

    let config = Config::load_from(tmp.path()).unwrap();
    let runtime = Runtime::from_settings(config.settings().unwrap()).unwrap();
    assert_eq!(runtime.lore_dir(None), tmp.path().join("lore"));
    assert_eq!(runtime.stories_dir(None), tmp.path().join("out/stories"));
    assert_eq!(runtime.images_dir(None), tmp.path().join("outputs/images"));

    let report = runtime.library().build(&runtime.lore_dir(None)).unwrap();
    assert_eq!((report.documents, report.chunks), (1, 1));
}
