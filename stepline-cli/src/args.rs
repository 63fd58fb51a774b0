use stepline_core::PlaybackMode;

pub const USAGE: &str = "\
usage: stepline [options]

  -v, --verbose         debug logging
  --engine HOST:PORT    synthesis engine address (default from config)
  --no-engine           run without sending anything
  --mode MODE           song | chain | phrase | oneshot
  --track N             track for chain/phrase mode (default 0)
  --start N             song row, chain or phrase to start from (default 0)
  --bpm BPM             override the configured tempo
  --seconds N           stop after N seconds (default: until playback ends)
  --samples DIR         directory holding the demo samples
  -h, --help            this text";

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub verbose: bool,
    pub help: bool,
    pub engine: Option<String>,
    pub no_engine: bool,
    pub mode: Option<PlaybackMode>,
    pub track: usize,
    pub start: usize,
    pub bpm: Option<f32>,
    pub seconds: Option<f64>,
    pub samples: String,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            verbose: false,
            help: false,
            engine: None,
            no_engine: false,
            mode: None,
            track: 0,
            start: 0,
            bpm: None,
            seconds: None,
            samples: "samples".to_string(),
        }
    }
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut out = CliArgs::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| format!("{} needs a value", name))
            };
            match arg.as_str() {
                "-v" | "--verbose" => out.verbose = true,
                "-h" | "--help" => out.help = true,
                "--no-engine" => out.no_engine = true,
                "--engine" => out.engine = Some(value("--engine")?),
                "--mode" => out.mode = Some(value("--mode")?.parse()?),
                "--track" => out.track = parse_number(&value("--track")?, "--track")?,
                "--start" => out.start = parse_number(&value("--start")?, "--start")?,
                "--bpm" => out.bpm = Some(parse_number(&value("--bpm")?, "--bpm")?),
                "--seconds" => out.seconds = Some(parse_number(&value("--seconds")?, "--seconds")?),
                "--samples" => out.samples = value("--samples")?,
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }
        Ok(out)
    }
}

fn parse_number<T: std::str::FromStr>(s: &str, name: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("{} expects a number, got '{}'", name, s))
}
