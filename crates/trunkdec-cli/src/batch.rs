//! Batch decode mode: walk captures and emit artifacts synchronously.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use tracing::{info, warn};

use trunkdec_audio::metadata;
use trunkdec_codec::NullVocoder;
use trunkdec_decoder::{dump, Decoder};

use crate::keys;

#[derive(Args)]
pub struct DecodeArgs {
    /// Capture file or directory of captures.
    pub input: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Recurse into subdirectories.
    #[arg(short, long)]
    pub recursive: bool,

    /// Write WAV audio.
    #[arg(long)]
    pub wav: bool,

    /// Write the JSON metadata sidecar.
    #[arg(long)]
    pub json: bool,

    /// Write the frame-analysis text report.
    #[arg(long)]
    pub text: bool,

    /// Write the per-frame CSV table.
    #[arg(long)]
    pub csv: bool,

    /// Decryption key as KEYID:KEYHEX; repeatable.
    #[arg(short = 'k', long = "key", value_name = "KEYID:KEYHEX")]
    pub keys: Vec<String>,
}

pub fn run(args: DecodeArgs) -> anyhow::Result<()> {
    if !(args.wav || args.json || args.text || args.csv) {
        bail!("no output requested: pass at least one of --wav, --json, --text, --csv");
    }

    let files = collect_captures(&args.input, args.recursive)?;
    if files.is_empty() {
        bail!("no .p25 captures found under {}", args.input.display());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    let mut decoder = Decoder::new(Box::new(NullVocoder));
    for spec in &args.keys {
        let (key_id, key) = keys::parse_key_spec(spec)?;
        decoder
            .add_key(key_id, key)
            .with_context(|| format!("registering key {spec}"))?;
    }

    let mut failures = 0usize;
    for file in &files {
        if let Err(e) = process_file(&mut decoder, file, &args) {
            warn!(file = %file.display(), error = %e, "capture failed");
            failures += 1;
        }
    }

    info!(
        processed = files.len() - failures,
        failed = failures,
        "batch decode finished"
    );

    if failures > 0 {
        bail!("{failures} of {} captures failed", files.len());
    }
    Ok(())
}

fn process_file(decoder: &mut Decoder, input: &Path, args: &DecodeArgs) -> anyhow::Result<()> {
    let stem_name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());
    let stem = args.output.join(&stem_name);

    let wav_path = stem.with_extension("wav");
    let summary = decoder
        .decode_file(input, args.wav.then_some(wav_path.as_path()), None)
        .with_context(|| format!("decoding {}", input.display()))?;

    if args.json {
        // A sidecar next to the capture is the recorder's own metadata;
        // merge it rather than replacing it.
        let caller = fs::read_to_string(input.with_extension("json")).ok();
        let basename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sidecar = metadata::merge_sidecar(caller.as_deref(), &summary.metadata, &basename);
        fs::write(stem.with_extension("json"), sidecar)
            .with_context(|| format!("writing {}.json", stem.display()))?;
    }

    if args.text {
        let out = File::create(stem.with_extension("txt"))
            .with_context(|| format!("creating {}.txt", stem.display()))?;
        dump::write_text_dump(input, BufWriter::new(out))?;
    }

    if args.csv {
        let out = File::create(stem.with_extension("csv"))
            .with_context(|| format!("creating {}.csv", stem.display()))?;
        dump::write_csv_dump(input, BufWriter::new(out))?;
    }

    info!(
        file = %input.display(),
        frames = summary.metadata.total_frames,
        voice = summary.metadata.voice_frames,
        encrypted = summary.metadata.has_encrypted_frames,
        truncated = summary.truncated,
        "capture processed"
    );

    Ok(())
}

/// A single file, or every `.p25` under a directory, sorted for stable
/// processing order.
fn collect_captures(input: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input {} is neither a file nor a directory", input.display());
    }

    let mut files = Vec::new();
    walk(input, recursive, &mut files)
        .with_context(|| format!("scanning {}", input.display()))?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                walk(&path, recursive, out)?;
            }
        } else if path.extension().is_some_and(|e| e == "p25") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_sorted_p25_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.p25"), b"").unwrap();
        fs::write(dir.path().join("a.p25"), b"").unwrap();
        fs::write(dir.path().join("ignore.wav"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.p25"), b"").unwrap();

        let flat = collect_captures(dir.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.p25", "b.p25"]);

        let deep = collect_captures(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn single_file_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.p25");
        fs::write(&file, b"").unwrap();

        assert_eq!(collect_captures(&file, false).unwrap(), vec![file]);
    }
}
