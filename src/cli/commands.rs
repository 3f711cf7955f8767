//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;

/// Commands for Relay Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate JSON document files in place
    Files {
        /// Input file or directory (required)
        #[arg(short, long)]
        file: PathBuf,

        /// Output directory (default: overwrite the input files)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Texts per batch request (default: from configuration)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Translate a single text and print the result
    Text {
        /// The text to translate
        text: String,
    },
}

/// Handle JSON document translation command.
///
/// Documents carry a `dataList` array whose entries hold a `content`
/// string; each content field is translated and replaced, every other
/// field is left untouched.
pub async fn handle_files(
    file: PathBuf,
    output: Option<PathBuf>,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use serde_json::Value;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Instant;
    use tracing::{info, warn};

    use crate::core::config::TranslatorConfig;
    use crate::core::models::{ProgressSink, TranslationTask};
    use crate::core::orchestrator::BatchOrchestrator;
    use crate::core::tags::encode_tags;

    let start_time = Instant::now();

    let config = TranslatorConfig::load()?;
    config.validate()?;
    let orchestrator = BatchOrchestrator::new(&config)?;

    let paths = collect_json_files(&file)?;
    if paths.is_empty() {
        anyhow::bail!("no .json documents found under {}", file.display());
    }
    info!("Found {} document(s)", paths.len());

    let mut docs: Vec<(PathBuf, Value)> = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(&path)?;
        let doc: Value = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        docs.push((path, doc));
    }

    // One task per content entry; write-backs report (slot, translation)
    // through the channel, drained after the run completes.
    let (tx, rx) = mpsc::channel::<(usize, String)>();
    let mut slots: Vec<(usize, usize)> = Vec::new();
    let mut tasks = Vec::new();

    for (doc_idx, (_, doc)) in docs.iter().enumerate() {
        let entries = match doc.pointer("/dataList").and_then(Value::as_array) {
            Some(entries) => entries,
            None => {
                warn!("{}: no dataList array, skipping", docs[doc_idx].0.display());
                continue;
            }
        };
        for (entry_idx, entry) in entries.iter().enumerate() {
            if let Some(content) = entry.get("content").and_then(Value::as_str) {
                let (encoded, tag_map) = encode_tags(content);
                let slot = slots.len();
                slots.push((doc_idx, entry_idx));

                let tx = tx.clone();
                tasks.push(TranslationTask::new(encoded, tag_map, move |translated| {
                    let _ = tx.send((slot, translated));
                }));
            }
        }
    }
    drop(tx);

    let total = tasks.len();
    if total == 0 {
        info!("Nothing to translate");
        return Ok(());
    }
    info!("Translating {} text(s)", total);

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({elapsed})")?
            .progress_chars("=>-"),
    );
    let bar_sink = bar.clone();
    let progress: Arc<dyn ProgressSink> = Arc::new(move |completed: usize, _total: usize| {
        bar_sink.set_position(completed as u64);
    });

    let batch_size = batch_size.unwrap_or(config.batch_size);
    orchestrator.submit(tasks, batch_size, progress).await?;
    bar.finish();

    // Apply results; entries whose translation failed keep their
    // original content.
    let mut translated = 0usize;
    for (slot, text) in rx.try_iter() {
        let (doc_idx, entry_idx) = slots[slot];
        let pointer = format!("/dataList/{entry_idx}/content");
        if let Some(content) = docs[doc_idx].1.pointer_mut(&pointer) {
            *content = Value::String(text);
            translated += 1;
        }
    }
    if translated < total {
        warn!("{} text(s) could not be translated", total - translated);
    }

    for (path, doc) in &docs {
        let target = match &output {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.join(path.file_name().unwrap_or_default())
            }
            None => path.clone(),
        };
        std::fs::write(&target, serde_json::to_string_pretty(doc)?)?;
        info!("Wrote {}", target.display());
    }

    info!(
        "Done: {translated}/{total} translated in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Handle single-text translation command
pub async fn handle_text(text: String) -> anyhow::Result<()> {
    use std::sync::mpsc;
    use std::sync::Arc;

    use crate::core::config::TranslatorConfig;
    use crate::core::models::{ProgressSink, TranslationTask};
    use crate::core::orchestrator::BatchOrchestrator;
    use crate::core::tags::encode_tags;

    let config = TranslatorConfig::load()?;
    config.validate()?;
    let orchestrator = BatchOrchestrator::new(&config)?;

    let (encoded, tag_map) = encode_tags(&text);
    let (tx, rx) = mpsc::channel::<String>();
    let task = TranslationTask::new(encoded, tag_map, move |translated| {
        let _ = tx.send(translated);
    });

    let progress: Arc<dyn ProgressSink> = Arc::new(|_completed: usize, _total: usize| {});
    orchestrator
        .submit(vec![task], config.batch_size, progress)
        .await?;

    match rx.try_recv() {
        Ok(translated) => {
            println!("{translated}");
            Ok(())
        }
        Err(_) => anyhow::bail!("translation failed; see the log for details"),
    }
}

/// All `.json` files at or under `input`, in stable order
fn collect_json_files(input: &PathBuf) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.clone()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_only_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = collect_json_files(&dir.path().to_path_buf()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn single_file_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(collect_json_files(&path).unwrap(), vec![path]);
    }
}
