mod args;

use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stepline_audio::{EngineClient, NullClient, OscClient, TransportFeedback, TransportHandle};
use stepline_core::demo::demo_store;
use stepline_core::Config;

use args::{CliArgs, USAGE};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("stepline")
        .join("stepline.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create(std::env::temp_dir().join("stepline.log"))) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("logging disabled: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("logging disabled: {}", e);
        return;
    }

    log::info!("stepline starting (log level: {:?})", log_level);
}

fn connect_engine(args: &CliArgs, config: &Config) -> Arc<dyn EngineClient> {
    if args.no_engine {
        return Arc::new(NullClient);
    }
    let addr = args.engine.clone().unwrap_or_else(|| config.engine_addr());
    match OscClient::connect(&addr, config.local_port(), config.latency_secs()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::warn!("engine at {} unavailable ({}), running silent", addr, e);
            eprintln!("engine at {} unavailable ({}), running silent", addr, e);
            Arc::new(NullClient)
        }
    }
}

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match CliArgs::parse(&raw) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return;
    }
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("stepline: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let mut settings = config.transport_settings();
    if let Some(bpm) = args.bpm {
        settings.tempo.bpm = bpm.clamp(20.0, 999.0);
    }
    let mode = args.mode.unwrap_or_else(|| config.mode());

    let client = connect_engine(args, &config);
    let mut transport = TransportHandle::spawn(client, settings)?;
    transport.set_store(demo_store(&args.samples))?;
    transport.play(mode.start(args.track, args.start), mode.policy())?;
    println!(
        "playing demo in {} mode at {} bpm ({} ticks per beat)",
        mode, settings.tempo.bpm, settings.tempo.ppq
    );

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    let mut rows_played = 0usize;
    let mut stop_sent = false;
    loop {
        if !stop_sent && deadline.is_some_and(|d| Instant::now() >= d) {
            transport.stop()?;
            stop_sent = true;
        }
        match transport.recv_feedback(Duration::from_millis(50)) {
            Some(TransportFeedback::RowPlayed(event)) => {
                rows_played += 1;
                log::debug!(
                    "track {} {} phrase {:02X} row {:02X}",
                    event.track,
                    event.pool.name(),
                    event.phrase,
                    event.row
                );
            }
            Some(TransportFeedback::TrackStopped { track }) => log::info!("track {} finished", track),
            Some(TransportFeedback::Telemetry(summary)) => log::debug!("{:?}", summary),
            Some(TransportFeedback::Stopped) => break,
            None => {}
        }
    }

    transport.shutdown();
    println!("stopped after {} rows", rows_played);
    Ok(())
}
