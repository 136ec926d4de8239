use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use lesson_upload::media::FfprobeProbe;
use lesson_upload::utils::{format_bytes, format_duration, format_speed};
use lesson_upload::{
    ChannelObserver, ChunkedUploader, Config, Difficulty, HttpBackend, Privacy, Quality, UploadEvent,
    UploadForm, VideoFile,
};

/// Upload a lesson video to a course in resumable chunks
#[derive(Parser, Debug)]
#[command(name = "lesson-upload", version, about)]
struct Args {
    /// Path to config.toml
    #[arg(short, long, env = "LESSON_UPLOAD_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Video file to upload
    file: PathBuf,

    #[arg(short, long)]
    title: String,

    #[arg(short, long, default_value = "")]
    description: String,

    /// Position of the lesson inside the course
    #[arg(long)]
    position: Option<u32>,

    /// Comma separated tags
    #[arg(long, default_value = "")]
    tags: String,

    #[arg(long, default_value = "beginner")]
    difficulty: Difficulty,

    #[arg(long, default_value = "public")]
    privacy: Privacy,

    #[arg(long, default_value = "auto")]
    quality: Quality,

    /// Mark the lesson as a free preview
    #[arg(long)]
    preview: bool,

    #[arg(long)]
    enable_downloads: bool,

    #[arg(long)]
    disable_comments: bool,

    /// Skip ffprobe metadata extraction
    #[arg(long)]
    no_probe: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lesson_upload=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn print_events(mut events: tokio::sync::mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Progress(progress) => {
                println!(
                    "Uploaded: {}/{} ({:.1}%), {} , ETA {}",
                    format_bytes(progress.uploaded_bytes),
                    format_bytes(progress.total_bytes),
                    progress.percentage,
                    format_speed(progress.speed),
                    format_duration(progress.remaining),
                );
            }
            UploadEvent::ChunkSkipped { index, error } => {
                println!("Chunk {} skipped: {}", index, error);
            }
            UploadEvent::StateChanged { new_state, .. } => {
                println!("Status: {:?}", new_state);
            }
            UploadEvent::Completed { video_url } => {
                println!("Video uploaded successfully {}", video_url.unwrap_or_default());
            }
            UploadEvent::Failed { error } => {
                println!("Upload failed: {}", error);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;

    let file = VideoFile::open(&args.file)
        .await
        .with_context(|| format!("Failed to open file: {}", args.file.display()))?;

    let mut form = UploadForm::new();
    form.set_file(file)?;
    form.set_title(args.title)?;
    form.set_description(args.description)?;
    form.set_position(args.position)?;
    form.set_tags_from_str(&args.tags)?;
    form.set_difficulty(args.difficulty)?;
    form.set_privacy(args.privacy)?;
    form.set_quality(args.quality)?;
    form.update(|details| {
        details.is_preview = args.preview;
        details.enable_downloads = args.enable_downloads;
        details.enable_comments = !args.disable_comments;
    })?;

    let backend = Arc::new(HttpBackend::new(
        &config.session_url,
        &config.complete_url,
        config.token.clone(),
        config.timeout(),
    )?);

    let mut uploader = ChunkedUploader::new(backend, &config.course_id, config.uploader_config())
        .with_validator(config.validator());
    if !args.no_probe {
        uploader = uploader.with_probe(Arc::new(FfprobeProbe::new()));
    }

    let (file, mut details) = form.lock()?;
    let mut job = uploader.prepare(file)?;

    if let Some(metadata) = uploader.inspect(job.file()).await {
        info!(
            duration = metadata.duration,
            width = metadata.width,
            height = metadata.height,
            has_thumbnail = metadata.thumbnail.is_some(),
            "video metadata"
        );
        details.format.get_or_insert(metadata.format);
    }

    let (observer, events) = ChannelObserver::new();
    let printer = tokio::spawn(print_events(events));

    let result = tokio::select! {
        result = uploader.upload(&mut job, &details, &observer) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    drop(observer);
    let _ = printer.await;

    match result {
        Some(Ok(outcome)) => {
            info!(
                uploaded = %format_bytes(outcome.uploaded_bytes),
                elapsed = ?outcome.elapsed,
                "done"
            );
            form.finish();
            Ok(())
        }
        Some(Err(err)) => {
            form.unlock();
            Err(err).context("Upload failed")
        }
        None => {
            warn!(upload_id = ?job.upload_id(), "upload abandoned");
            form.cancel();
            Ok(())
        }
    }
}
