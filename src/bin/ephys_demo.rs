use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ephys::{
    generate, AnalysisConfig, ArtifactParams, FilterSpec, PeakParams, PeakPolarity, Session,
    SynthConfig,
};

#[derive(Parser)]
#[command(name = "ephys_demo", about = "Filter, detect and summarise a synthetic recording")]
struct Args {
    /// Samples per channel
    #[arg(long, default_value_t = 10_000)]
    samples: usize,

    /// Number of channels
    #[arg(long, default_value_t = 3)]
    channels: usize,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = 1000.0)]
    rate: f64,

    /// Generator seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// AnalysisConfig JSON (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Filter as kind:freq (notch, lowpass, highpass); repeat, applied in order
    #[arg(long = "filter")]
    filters: Vec<FilterSpec>,

    /// Artifact threshold (absolute amplitude)
    #[arg(long, default_value_t = 2.5)]
    artifact_threshold: f64,

    /// Peak threshold (absolute amplitude)
    #[arg(long, default_value_t = 1.0)]
    peak_threshold: f64,

    /// Peak window length in ms
    #[arg(long, default_value_t = 100.0)]
    window_ms: f64,

    /// positive, negative or both
    #[arg(long, default_value_t = PeakPolarity::Both)]
    polarity: PeakPolarity,

    /// Keep peaks that fall inside artifacts
    #[arg(long)]
    no_exclude: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: AnalysisConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = load_config(args.config.as_ref())?;
    let synth = SynthConfig {
        n_samples: args.samples,
        n_channels: args.channels,
        sampling_rate_hz: args.rate,
        seed: args.seed,
        ..Default::default()
    };
    let recording = generate(&synth).context("synthesizing recording")?;
    eprintln!(
        "Synthesized {} ch × {} samples @ {} Hz",
        recording.channel_count(),
        recording.sample_count(),
        recording.sampling_rate_hz()
    );

    let mut session = Session::new(recording, cfg).context("opening session")?;
    for spec in &args.filters {
        session
            .apply_filter(*spec)
            .with_context(|| format!("applying {spec}"))?;
    }

    let all = 0..session.store().channel_count();
    let artifacts = session
        .detect_artifacts(&ArtifactParams::new(args.artifact_threshold, all.clone()))
        .context("artifact detection")?;
    eprintln!("Found {} artifact intervals", artifacts.iter().count());

    let width = ((args.window_ms / 1000.0) * args.rate).round().max(1.0) as usize;
    let params = PeakParams::new(args.peak_threshold, all, width)
        .exclude_artifacts(!args.no_exclude)
        .polarity(args.polarity);
    let peaks = session.detect_peaks(&params).context("peak detection")?;
    eprintln!("Found {} peaks (window {width} samples)", peaks.iter().count());

    let stats = session.statistics();
    let report = serde_json::json!({
        "config": session.config(),
        "filters": session.filters().active(),
        "channels": stats.all_channel_stats()?,
        "peaks": stats.all_peak_stats()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
