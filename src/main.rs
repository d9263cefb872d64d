//! lyrictag - convert vendor lyrics and embed them into audio files

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lyrictag::features::Settings;
use lyrictag::features::batch::{self, BatchMode, ScanConfig};
use lyrictag::features::lyrics::{
    ExportOptions, KrcDecryptor, LrcFormat, LyricsFormat, LyricsPayload, Precision,
    SubtitleFormat, TrackKind, decrypt::KRC_MAGIC, detect_format, export, ingest, parse_lyrics,
};
use lyrictag::features::media::{self, lyrics::read_lyrics_file};

/// CLI wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSubtitleFormat {
    Lrc,
    Srt,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(format: CliSubtitleFormat) -> Self {
        match format {
            CliSubtitleFormat::Lrc => SubtitleFormat::Lrc,
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
        }
    }
}

/// CLI wrapper for LrcFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLrcFormat {
    Line,
    Word,
    Enhanced,
}

impl From<CliLrcFormat> for LrcFormat {
    fn from(format: CliLrcFormat) -> Self {
        match format {
            CliLrcFormat::Line => LrcFormat::LineTimed,
            CliLrcFormat::Word => LrcFormat::WordTimed,
            CliLrcFormat::Enhanced => LrcFormat::Enhanced,
        }
    }
}

/// CLI wrapper for Precision to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPrecision {
    Centis,
    Millis,
}

impl From<CliPrecision> for Precision {
    fn from(precision: CliPrecision) -> Self {
        match precision {
            CliPrecision::Centis => Precision::Centis,
            CliPrecision::Millis => Precision::Millis,
        }
    }
}

/// Export flags shared by `convert` and `scan`
#[derive(Parser, Debug)]
struct ExportArgs {
    /// LRC word timing style
    #[arg(long, value_enum)]
    lrc_format: Option<CliLrcFormat>,

    /// LRC timestamp precision
    #[arg(long, value_enum)]
    precision: Option<CliPrecision>,

    /// Track order, e.g. "orig,roma,ts"
    #[arg(long, value_delimiter = ',')]
    order: Option<Vec<TrackKind>>,

    /// Render a single-word last track as a closing fragment
    #[arg(long)]
    trailing: bool,

    /// Close gaps between lines with an empty timestamp
    #[arg(long)]
    close_gaps: bool,

    /// Song length in milliseconds, closes the last SRT cue
    #[arg(long)]
    duration: Option<u64>,
}

impl ExportArgs {
    fn apply(&self, options: &mut ExportOptions) {
        if let Some(format) = self.lrc_format {
            options.format = format.into();
        }
        if let Some(precision) = self.precision {
            options.precision = precision.into();
        }
        if let Some(order) = &self.order {
            options.order = order.clone();
        }
        options.trailing_reference |= self.trailing;
        options.close_gaps |= self.close_gaps;
        if self.duration.is_some() {
            options.total_duration = self.duration;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a lyrics file or payload to LRC or SRT
    Convert {
        /// Lyrics file (LRC, KRC, encrypted KRC or plain text)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "lrc")]
        format: CliSubtitleFormat,

        /// Input holds a Base64 encoded encrypted KRC payload
        #[arg(long)]
        base64: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Print the lyrics stored for an audio file
    Read {
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,
    },

    /// Save lyrics into an MP3 tag or a sidecar file
    Embed {
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,

        /// Lyrics file (defaults to the audio file's sidecar)
        #[arg(value_name = "LYRICS")]
        lyrics: Option<PathBuf>,

        /// Language code written into the lyrics frame
        #[arg(short, long)]
        language: Option<String>,

        /// Always write a sidecar file
        #[arg(long)]
        sidecar: bool,
    },

    /// Show audio metadata as JSON
    Info {
        #[arg(value_name = "AUDIO")]
        audio: PathBuf,
    },

    /// Process every audio file below a directory
    Scan {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Export lyrics in this format instead of embedding sidecars
        #[arg(short, long, value_enum)]
        export: Option<CliSubtitleFormat>,

        /// Maximum directory depth
        #[arg(long)]
        max_depth: Option<usize>,

        #[command(flatten)]
        export_args: ExportArgs,
    },
}

#[derive(Parser, Debug)]
#[command(name = "lyrictag")]
#[command(version)]
#[command(about = "Convert KRC/LRC lyrics and embed them into audio files")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {:?}", path)),
        None => Ok(Settings::load()),
    }
}

fn convert(
    input: &Path,
    format: SubtitleFormat,
    base64: bool,
    output: Option<&Path>,
    options: &ExportOptions,
) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let payload = if base64 {
        LyricsPayload::encrypted_base64(String::from_utf8_lossy(&bytes).into_owned())
    } else if bytes.starts_with(KRC_MAGIC) {
        LyricsPayload::encrypted(bytes)
    } else {
        LyricsPayload::plaintext(bytes)
    };

    let parsed = ingest(&payload, &KrcDecryptor).context("Failed to decode lyrics")?;
    let rendered = export(&parsed, format, options);

    match output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("Failed to write {:?}", path))?
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn read(audio: &Path) -> Result<()> {
    let found = media::find_lyrics(audio)
        .with_context(|| format!("No lyrics found for {:?}", audio))?;
    tracing::info!("Lyrics source: {:?}", found.source);
    println!("{}", found.text);
    Ok(())
}

fn embed(
    audio: &Path,
    lyrics: Option<&Path>,
    language: Option<String>,
    sidecar: bool,
    settings: &Settings,
) -> Result<()> {
    let text = match lyrics {
        Some(path) => read_lyrics_file(path),
        None => media::find_lyrics(audio).map(|found| found.text),
    }
    .context("No lyrics to embed")?;

    // Players only read LRC out of tags
    let text = if detect_format(&text) == LyricsFormat::Krc {
        export(&parse_lyrics(&text), SubtitleFormat::Lrc, &settings.export)
    } else {
        text
    };

    let mut write = settings.write.clone();
    if let Some(language) = language {
        write.language = language;
    }
    write.embed &= !sidecar;

    let result = media::save_lyrics(audio, &text, &write);
    if !result.success {
        anyhow::bail!(result.message);
    }
    match result.path {
        Some(path) => println!("{}: {}", result.message, path.display()),
        None => println!("{}", result.message),
    }
    Ok(())
}

fn info(audio: &Path) -> Result<()> {
    let metadata = media::extract_metadata(audio)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn scan(dir: &Path, config: &ScanConfig, settings: &Settings) -> Result<()> {
    let report = batch::scan(dir, config, settings)?;
    for (path, outcome) in &report.outcomes {
        println!("{}: {}", path.display(), outcome);
    }
    println!(
        "{} files: {} done, {} skipped, {} failed",
        report.total(),
        report.succeeded(),
        report.skipped(),
        report.failed()
    );
    if report.failed() > 0 {
        anyhow::bail!("{} files failed", report.failed());
    }
    Ok(())
}

fn main() -> Result<()> {
    let options = CommandLineOptions::parse();

    // Initialize tracing for logging
    let default_level = if options.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut settings = load_settings(options.config.as_deref())?;

    match options.command {
        Commands::Convert {
            input,
            format,
            base64,
            output,
            export,
        } => {
            export.apply(&mut settings.export);
            convert(
                &input,
                format.into(),
                base64,
                output.as_deref(),
                &settings.export,
            )
        }
        Commands::Read { audio } => read(&audio),
        Commands::Embed {
            audio,
            lyrics,
            language,
            sidecar,
        } => embed(&audio, lyrics.as_deref(), language, sidecar, &settings),
        Commands::Info { audio } => info(&audio),
        Commands::Scan {
            dir,
            export,
            max_depth,
            export_args,
        } => {
            export_args.apply(&mut settings.export);
            let config = ScanConfig {
                mode: export.map_or(BatchMode::Embed, |f| BatchMode::Export(f.into())),
                max_depth,
                ..Default::default()
            };
            scan(&dir, &config, &settings)
        }
    }
}
