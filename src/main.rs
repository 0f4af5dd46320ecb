use apng_player::{
    log_error, log_info, log_warn, Apng, Callbacks, DecodeOptions, Logger, ManualClock, PlaybackEngine,
    PlaybackOptions,
};
use clap::Parser;
use glob::glob;
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "apng-player")]
struct Cli {
    #[arg(required = true, help = "File path or glob pattern")]
    path: String,

    #[arg(long, help = "Print the stream summary without decoding pixels")]
    info: bool,

    #[arg(long, help = "Print the summary as JSON")]
    json: bool,

    #[arg(long, value_name = "MS", help = "Simulate playback for this many milliseconds")]
    play: Option<f64>,

    #[arg(long, value_name = "MS", default_value_t = 16.0, help = "Tick length used by --play")]
    tick: f64,

    #[arg(long, default_value_t = 1.0, help = "Playback speed multiplier")]
    speed: f64,

    #[arg(long = "no-loop", help = "Stop after the first lap")]
    no_loop: bool,

    #[arg(long = "no-crc", help = "Skip chunk CRC verification")]
    no_crc: bool,

    #[arg(long, default_value_t = 30.0, help = "Frame rate for frames without timing")]
    fps: f64,

    #[arg(short, long)]
    verbose: bool,
}

fn get_files(path: &str) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let absolute_pattern = if Path::new(path).is_relative() {
        base_dir.join(path).to_string_lossy().into_owned()
    } else {
        path.to_string()
    };

    for entry in glob(&absolute_pattern)? {
        match entry {
            Ok(path) => {
                if !path.is_file() {
                    continue;
                }

                files.push(path);
            }
            Err(e) => log_warn!("{}", e),
        }
    }

    Ok(files)
}

fn simulate(apng: Apng, cli: &Cli, duration_ms: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.tick.is_finite() || cli.tick <= 0.0 {
        return Err(format!("tick must be a positive number of milliseconds, got {}", cli.tick).into());
    }

    let sequence = Arc::new(apng.decode()?);
    let clock = Rc::new(ManualClock::new());

    let callbacks = Callbacks::new()
        .with_on_frame_change(|index| log_info!("frame -> {}", index))
        .with_on_loop(|| log_info!("loop"))
        .with_on_complete(|| log_info!("complete"));

    let options = PlaybackOptions::default()
        .with_loop(!cli.no_loop)
        .with_animation_speed(cli.speed);

    let mut engine = PlaybackEngine::builder(Arc::clone(&sequence))
        .options(options)
        .callbacks(callbacks)
        .clock(clock.clone())
        .build()?;

    println!(
        "Playing {} frames ({:.1} ms per lap) for {} ms",
        sequence.frame_count(),
        sequence.total_duration(),
        duration_ms
    );

    while clock.elapsed_ms() < duration_ms && engine.is_playing() {
        let step = cli.tick.min(duration_ms - clock.elapsed_ms());
        clock.advance(step, [&mut engine])?;
    }

    println!(
        "Stopped at frame {} ({:.1} ms, {:.0}% of lap)",
        engine.current_frame()?,
        engine.current_time()?,
        engine.progress()? * 100.0
    );

    engine.dispose()?;

    Ok(())
}

fn process_file(file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("File: {}", file.display());

    let options = DecodeOptions::default()
        .with_crc_check(!cli.no_crc)
        .with_fallback_fps(cli.fps);
    let apng = Apng::open(file)?.with_options(options);

    if let Some(duration_ms) = cli.play {
        return simulate(apng, cli, duration_ms);
    }

    if cli.info || cli.json {
        let info = apng.probe()?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            println!("{}", info);
        }
        return Ok(());
    }

    let sequence = apng.decode()?;
    println!(
        "Decoded {}x{}, {} frame(s), {:.1} ms, plays: {}",
        sequence.width(),
        sequence.height(),
        sequence.frame_count(),
        sequence.total_duration(),
        if sequence.loop_count() == 0 {
            "infinite".to_string()
        } else {
            sequence.loop_count().to_string()
        }
    );

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    Logger::init(level).map_err(|e| e.to_string())?;

    let files = get_files(&cli.path)?;

    if files.is_empty() {
        log_error!("No files found matching pattern: {}", cli.path);
        return Ok(());
    }

    for file in files {
        if let Err(err) = process_file(&file, &cli) {
            log_error!("Error processing {}: {}", file.display(), err);
            continue;
        }
    }

    Ok(())
}
