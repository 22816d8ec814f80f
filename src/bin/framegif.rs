use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use framegif::progress::{NoProgress, ProgressReporter};
use framegif::{CompositeJob, Settings, Source};
use pbr::ProgressBar;
use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn bin_main() -> BinResult<()> {
    let matches = Command::new("framegif")
        .version(crate_version!())
        .about("Puts an animated GIF inside a device frame image")
        .arg_required_else_help(true)
        .arg(Arg::new("output")
            .long("output")
            .short('o')
            .help("Destination file to write to")
            .num_args(1)
            .value_name("a.gif")
            .value_parser(value_parser!(PathBuf))
            .required(true))
        .arg(Arg::new("frame")
            .long("frame")
            .short('f')
            .help("Still background image (device frame), e.g. PNG with a transparent screen")
            .num_args(1)
            .value_name("frame.png")
            .value_parser(value_parser!(PathBuf))
            .required(true))
        .arg(Arg::new("width")
            .long("width")
            .short('W')
            .num_args(1)
            .value_name("px")
            .value_parser(value_parser!(u32).range(1..=65535))
            .default_value("2257")
            .help("Width every animation frame is stretched to"))
        .arg(Arg::new("height")
            .long("height")
            .short('H')
            .num_args(1)
            .value_name("px")
            .value_parser(value_parser!(u32).range(1..=65535))
            .default_value("4854")
            .help("Height every animation frame is stretched to"))
        .arg(Arg::new("radius")
            .long("radius")
            .short('r')
            .num_args(1)
            .value_name("px")
            .value_parser(value_parser!(u32))
            .default_value("275")
            .help("Radius of the rounded corners"))
        .arg(Arg::new("duration")
            .long("duration")
            .num_args(1)
            .value_name("ms")
            .value_parser(value_parser!(u32))
            .default_value("100")
            .help("Display time of each frame"))
        .arg(Arg::new("once")
            .long("once")
            .action(ArgAction::SetTrue)
            .help("Do not loop the GIF"))
        .arg(Arg::new("quiet")
            .long("quiet")
            .short('q')
            .action(ArgAction::SetTrue)
            .help("Do not show a progress bar"))
        .arg(Arg::new("verbose")
            .long("verbose")
            .short('v')
            .action(ArgAction::SetTrue)
            .help("Log details of each stage to stderr"))
        .arg(Arg::new("INPUT")
            .help("One animated GIF, or multiple PNG animation frames")
            .num_args(1..)
            .value_parser(value_parser!(PathBuf))
            .required(true))
        .get_matches_from(wild::args_os());

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if matches.get_flag("verbose") { Level::DEBUG } else { Level::WARN })
        .init();

    let mut inputs: Vec<PathBuf> = matches.get_many::<PathBuf>("INPUT").ok_or("Missing input")?.cloned().collect();
    let output = matches.get_one::<PathBuf>("output").ok_or("Missing output")?.clone();
    let background = matches.get_one::<PathBuf>("frame").ok_or("Missing frame")?.clone();
    let settings = Settings {
        width: *matches.get_one::<u32>("width").ok_or("Missing width")?,
        height: *matches.get_one::<u32>("height").ok_or("Missing height")?,
        corner_radius: *matches.get_one::<u32>("radius").ok_or("Missing radius")?,
        frame_duration_ms: *matches.get_one::<u32>("duration").ok_or("Missing duration")?,
        once: matches.get_flag("once"),
    };

    let source = if inputs.len() == 1 {
        let path = inputs.remove(0);
        check_exists(&path)?;
        Source::Path(path)
    } else {
        for path in &inputs {
            check_exists(path)?;
        }
        Source::from_png_files(inputs)
    };
    check_exists(&background)?;

    let job = CompositeJob { source, background, output, settings };
    let mut progress: Box<dyn ProgressReporter> = if matches.get_flag("quiet") {
        Box::new(NoProgress {})
    } else {
        Box::new(ProgressBarReporter::new())
    };

    let done = framegif::run(job, &mut progress)?;
    let shown = dunce::canonicalize(&done.output_path).unwrap_or(done.output_path);
    println!("framegif created {} in {:.1}s", shown.display(), done.elapsed_seconds);
    Ok(())
}

fn check_exists(path: &Path) -> BinResult<()> {
    if path.exists() {
        return Ok(());
    }
    let msg = format!("Unable to find the input file: \"{}\"", path.display());
    Err(msg.into())
}

/// Percent bar on stdout, with the current stage as its message
struct ProgressBarReporter {
    pb: ProgressBar<Stdout>,
}

impl ProgressBarReporter {
    fn new() -> Self {
        let mut pb = ProgressBar::new(100);
        pb.show_speed = false;
        pb.show_counter = false;
        pb.set_max_refresh_rate(Some(Duration::from_millis(250)));
        Self { pb }
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn on_progress(&mut self, percent: u8) {
        self.pb.set(percent.into());
    }

    fn on_status(&mut self, message: &str) {
        self.pb.message(&format!("{} ", message));
    }

    fn on_finished(&mut self, _output_path: &Path, _elapsed_seconds: f64) {
        self.pb.finish_print("");
    }

    fn on_error(&mut self, _message: String) {
        // the error itself is printed by main
        self.pb.finish();
    }
}
