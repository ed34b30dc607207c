use difftour::application::narration::RenderStyle;
use difftour::application::playback::{
    ChannelContinuation, Continuation, PlaybackMode, PlaybackReport,
};
use difftour::application::walkthrough::{self, WalkthroughOptions};
use difftour::domain::{NarrationError, WalkthroughError};
use difftour::infra::app_config::load_config_from;
use difftour::infra::narrator::{NarrationEngine, NarratorRegistry, ReplayNarrator};
use pretty_assertions::assert_eq;

const DIFF: &str = "diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1,2 +1,2 @@
-fn old() {}
+fn new() {}
 fn same() {}
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -5,1 +5,2 @@
 use a;
+use b;
diff --git a/c.rs b/c.rs
new file mode 100644
--- /dev/null
+++ b/c.rs
@@ -0,0 +1,1 @@
+pub struct C;
";

fn options(mode: PlaybackMode) -> WalkthroughOptions {
    WalkthroughOptions {
        mode,
        style: RenderStyle::Markdown,
        ..Default::default()
    }
}

async fn run_replay(
    narration: &str,
    mode: PlaybackMode,
    continuation: Option<&mut dyn Continuation>,
) -> (Result<PlaybackReport, WalkthroughError>, String, String) {
    let narrator = ReplayNarrator::from_text(narration).with_chunk_chars(5);
    let index = walkthrough::index_diff(DIFF, 100).unwrap();
    let mut out = Vec::new();
    let mut prompts = Vec::new();
    let result = walkthrough::run(
        &narrator,
        index,
        &["Rename old to new".to_string()],
        &options(mode),
        &mut out,
        &mut prompts,
        continuation,
    )
    .await;
    (
        result,
        String::from_utf8(out).unwrap(),
        String::from_utf8(prompts).unwrap(),
    )
}

const NARRATION: &str = "First the rename. [[ref:a.rs:hunk:1]] That is all for a.rs. \
[[ref:b.rs:hunk:1]][[ref:c.rs]] Both imports and the new type land together. \
[[ref:a.rs:hunk:2]] That hunk does not exist.";

#[tokio::test]
async fn test_continuous_replay_renders_everything() {
    let (result, out, prompts) = run_replay(NARRATION, PlaybackMode::Continuous, None).await;
    let report = result.unwrap();
    assert_eq!(report.references, 4);
    assert!(prompts.is_empty());
    assert!(out.starts_with("First the rename. \n```diff\ndiff --git a/a.rs b/a.rs\n"));
    assert!(out.contains("@@ -5,1 +5,2 @@\n use a;\n+use b;\n```\n"));
    assert!(out.contains("@@ -0,0 +1,1 @@\n+pub struct C;\n```\n"));
    assert!(out.contains("\n> **warning: [[ref:a.rs]]: hunk 2 does not exist (file has 1 hunk)**\n"));
    assert!(out.ends_with(" That hunk does not exist."));
}

#[tokio::test]
async fn test_paged_replay_prompts_between_blocks() {
    let (tx, mut continuation) = ChannelContinuation::channel();
    for _ in 0..3 {
        tx.send(()).unwrap();
    }

    let (result, out, prompts) = run_replay(
        NARRATION,
        PlaybackMode::Paged,
        Some(&mut continuation as &mut dyn Continuation),
    )
    .await;
    let report = result.unwrap();
    // Intro, then one block per run of references and the prose after it.
    assert_eq!(report.blocks, 4);
    assert_eq!(
        prompts,
        "\n[Enter] continue to part 2: a.rs\n\
         \n[Enter] continue to part 3: b.rs, c.rs\n\
         \n[Enter] continue to part 4: a.rs\n"
    );

    let (_, continuous, _) = run_replay(NARRATION, PlaybackMode::Continuous, None).await;
    assert_eq!(out, continuous);
}

#[tokio::test]
async fn test_paged_replay_without_more_input_finishes_unpaced() {
    let (tx, mut continuation) = ChannelContinuation::channel();
    drop(tx);

    let (result, out, prompts) = run_replay(
        NARRATION,
        PlaybackMode::Paged,
        Some(&mut continuation as &mut dyn Continuation),
    )
    .await;
    assert_eq!(result.unwrap().blocks, 4);
    // Only the first prompt is shown; the closed input switches pacing off.
    assert_eq!(prompts, "\n[Enter] continue to part 2: a.rs\n");
    assert!(out.ends_with(" That hunk does not exist."));
}

#[tokio::test]
async fn test_whitespace_between_references_keeps_one_block() {
    let (tx, mut continuation) = ChannelContinuation::channel();
    tx.send(()).unwrap();

    let narration = "[[ref:a.rs]][[ref:b.rs]]  hello[[ref:c.rs]]world";
    let (result, out, prompts) = run_replay(
        narration,
        PlaybackMode::Paged,
        Some(&mut continuation as &mut dyn Continuation),
    )
    .await;
    assert_eq!(result.unwrap().blocks, 2);
    assert_eq!(prompts, "\n[Enter] continue to part 2: c.rs\n");
    assert!(out.ends_with("```\nworld"));
}

#[tokio::test]
async fn test_paged_without_continuation_plays_continuously() {
    let (result, out, prompts) = run_replay(NARRATION, PlaybackMode::Paged, None).await;
    assert_eq!(result.unwrap().references, 4);
    assert!(prompts.is_empty());
    assert!(out.ends_with(" That hunk does not exist."));
}

#[tokio::test]
async fn test_missing_recording_fails_the_run() {
    let narrator = ReplayNarrator::from_file("/no/such/narration.txt");
    let index = walkthrough::index_diff(DIFF, 100).unwrap();
    let mut out = Vec::new();
    let mut prompts = Vec::new();
    let result = walkthrough::run(
        &narrator,
        index,
        &[],
        &options(PlaybackMode::Continuous),
        &mut out,
        &mut prompts,
        None,
    )
    .await;
    assert!(matches!(
        result,
        Err(WalkthroughError::Narration(NarrationError::Io(_)))
    ));
    assert!(out.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_narrator_process_is_fatal_after_partial_output() {
    use difftour::infra::narrator::CommandNarrator;

    let narrator = CommandNarrator::new(
        "failing",
        "Failing narrator",
        "sh",
        [
            "-c",
            "cat >/dev/null; echo 'Looking at [[ref:a.rs]] first'; echo boom >&2; exit 3",
        ],
    );
    let index = walkthrough::index_diff(DIFF, 100).unwrap();
    let mut out = Vec::new();
    let mut prompts = Vec::new();
    let result = walkthrough::run(
        &narrator,
        index,
        &[],
        &options(PlaybackMode::Continuous),
        &mut out,
        &mut prompts,
        None,
    )
    .await;

    match result {
        Err(WalkthroughError::Narration(NarrationError::ProcessFailed { stderr, .. })) => {
            assert!(stderr.contains("boom"));
        }
        other => panic!("expected a process failure, got {other:?}"),
    }
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Looking at \n```diff\ndiff --git a/a.rs b/a.rs\n"));
}

#[test]
fn test_configured_narrator_is_selectable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
narrator = "local"
mode = "paged"

[narrators.local]
command = "ollama"
args = ["run", "llama3"]
display_name = "Local model"
"#,
    )
    .unwrap();

    let config = load_config_from(&path);
    assert_eq!(config.mode, Some(PlaybackMode::Paged));
    let registry = NarratorRegistry::with_configured(&config.narrators);
    let narrator = registry.select(&config.narrator).unwrap();
    assert_eq!(narrator.id(), "local");
    assert_eq!(narrator.display_name(), "Local model");

    let err = registry.select("nope").err().unwrap();
    assert!(matches!(err, WalkthroughError::UnknownNarrator { .. }));
}

#[test]
fn test_size_ceiling_and_empty_diff() {
    assert!(matches!(
        walkthrough::index_diff(DIFF, 5),
        Err(WalkthroughError::DiffTooLarge { lines: 6, limit: 5 })
    ));
    assert!(matches!(
        walkthrough::index_diff("no diff here\n", 5),
        Err(WalkthroughError::EmptyDiff)
    ));
}
