use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ac2art::augment::Augmenter;
use ac2art::cli::{AugmentArgs, AugmentTarget, Cli, Command, SplitArgs};
use ac2art::config::RunConfig;
use ac2art::model::Ac2ArtNetwork;
use ac2art::pipeline::{run_prediction_pipeline, PredictionRequest};
use ac2art::split;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli
        .global
        .run_config()
        .context("Failed to resolve project configuration")?;
    info!(root = %config.layout.root.display(), "project root");

    match cli.command {
        Command::PredictAbx(args) => run_prediction(&config, &args.request()?),
        Command::Invert(args) => run_prediction(&config, &args.request()?),
        Command::Augment(args) => handle_augment(&config, &args),
        Command::Split(args) => handle_split(&config, &args),
    }
}

fn run_prediction(config: &RunConfig, request: &PredictionRequest) -> Result<()> {
    let summary = run_prediction_pipeline(config, request, Ac2ArtNetwork::load)?;
    println!(
        "extracted {} / predicted {} / records {}",
        summary.extracted,
        summary.predicted,
        summary.records.len()
    );
    Ok(())
}

fn handle_augment(config: &RunConfig, args: &AugmentArgs) -> Result<()> {
    let velum_path = config.layout.velum_weights_path();
    let needs_velum = args.targets.iter().any(|target| match target {
        AugmentTarget::Corpus(corpus) => corpus
            .speakers()
            .iter()
            .any(|speaker| speaker.layout().needs_features()),
        AugmentTarget::Speaker(speaker) => speaker.layout().needs_features(),
    });
    let velum = if needs_velum {
        let model = Ac2ArtNetwork::load(&velum_path, config.velum_dims)
            .with_context(|| format!("Failed to load velum model from {:?}", velum_path))?;
        Some(model)
    } else {
        None
    };

    let augmenter = Augmenter::new(config.layout.clone(), config.mismatch, velum);
    for target in &args.targets {
        let report = match *target {
            AugmentTarget::Corpus(corpus) => augmenter.augment_corpus(corpus, args.max),
            AugmentTarget::Speaker(speaker) => augmenter.augment_speaker(speaker, args.max),
        }
        .with_context(|| format!("Failed to augment {}", describe(target)))?;
        println!(
            "{}: {} extended trajectories written, {} with mismatched rows",
            describe(target),
            report.written,
            report.mismatched
        );
    }
    Ok(())
}

fn handle_split(config: &RunConfig, args: &SplitArgs) -> Result<()> {
    args.validate()?;
    let report = if args.speaker_dirs.is_empty() {
        let root = config.layout.preprocessed_root();
        if !root.is_dir() {
            bail!("Preprocessed directory does not exist: {:?}", root);
        }
        split::split_all(&root, args.max_length, config.mismatch)
            .with_context(|| format!("Failed to split recordings under {:?}", root))?
    } else {
        let mut total = split::SplitReport::default();
        for dir in &args.speaker_dirs {
            let report = split::split_speaker(dir, args.max_length, config.mismatch)
                .with_context(|| format!("Failed to split recordings in {:?}", dir))?;
            total.recordings_cut += report.recordings_cut;
            total.segments_written += report.segments_written;
        }
        total
    };
    println!(
        "{} recordings cut into {} segments",
        report.recordings_cut, report.segments_written
    );
    Ok(())
}

fn describe(target: &AugmentTarget) -> String {
    match target {
        AugmentTarget::Corpus(corpus) => format!("corpus {corpus}"),
        AugmentTarget::Speaker(speaker) => format!("speaker {speaker}"),
    }
}
