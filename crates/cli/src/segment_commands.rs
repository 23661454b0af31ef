//! `relay segment`: preview how a reply would be split.

use std::{io::Read, path::PathBuf};

use {
    anyhow::{Context, Result},
    clap::Args,
    relay_config::OutboundConfig,
    relay_line::{Boundary, Segmenter},
};

#[derive(Args)]
pub struct SegmentArgs {
    /// Read the text from a file instead of stdin.
    #[arg(long, short)]
    file: Option<PathBuf>,
    /// Maximum characters per segment (overrides config).
    #[arg(long)]
    max: Option<usize>,
    /// Print segments as a JSON array.
    #[arg(long)]
    json: bool,
}

pub fn handle_segment(args: SegmentArgs, outbound: &OutboundConfig) -> Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        },
    };

    let max = args.max.unwrap_or(outbound.max_segment_length);
    let segmenter = Segmenter::new(max, &outbound.sentence_terminators);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&segments_json(&segmenter, &text))?);
        return Ok(());
    }

    let pieces = segmenter.split_with_boundaries(&text);
    for (i, (segment, boundary)) in pieces.iter().enumerate() {
        println!(
            "── segment {} ({} chars, {}) ──",
            i + 1,
            segment.char_len(),
            boundary_name(*boundary)
        );
        println!("{}", segment.content());
    }
    eprintln!("{} segment(s), limit {max}", pieces.len());
    Ok(())
}

fn segments_json(segmenter: &Segmenter, text: &str) -> serde_json::Value {
    segmenter
        .split_with_boundaries(text)
        .iter()
        .map(|(segment, boundary)| {
            serde_json::json!({
                "text": segment.content(),
                "chars": segment.char_len(),
                "boundary": boundary_name(*boundary),
            })
        })
        .collect()
}

fn boundary_name(boundary: Boundary) -> &'static str {
    match boundary {
        Boundary::Newline => "newline",
        Boundary::Terminator => "terminator",
        Boundary::Hard => "hard cut",
        Boundary::End => "end",
    }
}
