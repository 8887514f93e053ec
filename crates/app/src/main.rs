use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use chromatone_core::{
    decode_wav, encode, AppConfig, EncodeJob, NullSink, Recorder, SinkRequest,
};
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Commands::Decode {
            input,
            min,
            max,
            config,
        }) => run_decode(&input, min, max, config.as_deref()),
        None if cli.encode.input.is_none() => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "an input text file is required: chromatone <INPUT> [REPEAT_COUNT]",
            )
            .exit(),
        None => run_encode(cli.encode),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_encode(args: EncodeArgs) -> chromatone_core::Result<()> {
    let Some(input) = args.input else {
        return Err("missing input file".into());
    };
    tracing::info!(?input, repeat_count = args.repeat_count, "running encode pipeline");

    let job = EncodeJob {
        output_dir: args.output_dir,
        config: load_config(args.config.as_deref())?,
        ..EncodeJob::new(input, args.repeat_count)
    };

    let report = if args.dry_run {
        encode(&job, |_| Ok(NullSink::default()))?
    } else {
        encode(&job, |request: &SinkRequest<'_>| {
            Recorder::start(
                request.settings,
                request.width,
                request.height,
                request.soundtrack,
                request.output,
            )
        })?
    };

    println!("Encoded audio saved as {}", report.encoded_wav.display());
    println!("Repeat beep saved as {}", report.beep_wav.display());
    if args.dry_run {
        println!(
            "Rendered {} frames ({:.1}s); video encoding skipped",
            report.frames, report.duration_seconds
        );
    } else {
        println!("Video with audio saved as {}", report.video.display());
    }
    println!(
        "Decode with: chromatone decode {} --min {} --max {}",
        report.encoded_wav.display(),
        report.frequency_map.min_code_point,
        report.frequency_map.max_code_point
    );
    Ok(())
}

fn run_decode(
    input: &Path,
    min: u32,
    max: u32,
    config: Option<&Path>,
) -> chromatone_core::Result<()> {
    let config = load_config(config)?;
    let summary = decode_wav(input, min, max, &config.audio)?;
    tracing::info!(
        characters = summary.tones.len(),
        replaced = summary.replaced,
        "decoded tone track"
    );
    println!("{}", summary.text);
    Ok(())
}

fn load_config(path: Option<&Path>) -> chromatone_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_json_file(path),
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Encode text as tones and coloured squares",
    long_about = None,
    args_conflicts_with_subcommands = true,
    allow_negative_numbers = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    encode: EncodeArgs,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Text file to encode.
    input: Option<PathBuf>,
    /// Any value above zero adds one REPEAT card and a replay.
    #[arg(default_value_t = 1)]
    repeat_count: i64,
    /// JSON file overriding the default settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory that receives the generated files.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Render every frame but skip the external video encoder.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recover text from an encoded WAV file.
    Decode {
        /// Path to a `<stem>-enc.wav` file.
        input: PathBuf,
        /// Lowest code point present in the original text.
        #[arg(long)]
        min: u32,
        /// Highest code point present in the original text.
        #[arg(long)]
        max: u32,
        /// JSON file overriding the default settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
