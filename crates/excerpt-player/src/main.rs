//! Excerpt Player - terminal preview player for region-bounded excerpts
//!
//! This is the entry point for the command-line player. It:
//! 1. Opens the default system output through CPAL
//! 2. Loads the WAV file named on the command line
//! 3. Restores persisted envelope settings from the user config directory
//! 4. Pumps the preview session at ~60 Hz while reading commands from stdin
//!
//! ## Command line flags
//!
//! - `--region START END`: initial region bounds in seconds
//! - `--profile NAME`: envelope profile (same names as the `profile` command)
//! - `--volume GAIN`: base gain in `[0, 1]`
//! - `--fade-in S` / `--fade-out S`: profile ramp lengths in seconds
//! - `--loop`: start with loop playback enabled
//! - `--autoplay`: start playing as soon as the track is loaded
//! - `--delete-mode`: dim the kept sections instead of the excluded ones
//! - `--duration-limit S`: exit after this many seconds
//!
//! With stdin closed (piped input) the player keeps pumping until playback
//! stops on its own or the duration limit runs out.

mod command;
mod term;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use excerpt_core::audio::CpalTransport;
use excerpt_core::config::{default_config_path, load_config, save_config, PreviewConfig};
use excerpt_core::envelope::EnvelopeProfile;
use excerpt_core::session::PreviewSession;

use command::Command;
use term::TermSurface;

/// Pump cadence; matches the render scheduler's paint interval
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

const USAGE: &str = "usage: excerpt-player <file.wav> [--region START END] [--profile NAME] \
                     [--volume GAIN] [--fade-in S] [--fade-out S] [--loop] [--autoplay] \
                     [--delete-mode] [--duration-limit S]";

/// Everything accepted on the command line
#[derive(Debug, Default, PartialEq)]
struct PlayerArgs {
    file: PathBuf,
    loop_enabled: bool,
    autoplay: bool,
    delete_mode: bool,
    region: Option<(f64, f64)>,
    profile: Option<EnvelopeProfile>,
    volume: Option<f64>,
    fade_in: Option<f64>,
    fade_out: Option<f64>,
    duration_limit: Option<f64>,
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&raw)?;

    log::info!("excerpt-player starting up");

    let config_path = default_config_path("preview.yaml");
    let config: PreviewConfig = load_config(&config_path);

    let transport = CpalTransport::new().context(
        "could not open an audio output device (is a sound server running?)",
    )?;

    let mut session = PreviewSession::new(Box::new(transport));
    session.apply_config(&config);
    apply_flag_overrides(&mut session, &args);
    session.set_on_play_state_change(|playing| {
        log::info!("{}", if playing { "Playing" } else { "Paused" })
    });
    session.set_on_play_end(|| log::info!("Region finished"));
    session.set_on_region_change(|change| {
        log::debug!(
            "region [{:.2}s, {:.2}s] via {} (history: {})",
            change.start,
            change.end,
            change.intent.label(),
            change.record_history
        )
    });

    session
        .load_track_file(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    if let Some((start, end)) = args.region {
        if !session.set_region_bounds(start, end) {
            bail!("invalid region {}..{} for {}", start, end, args.file.display());
        }
    }

    println!("Excerpt Player - {}", args.file.display());
    print_help();

    if args.autoplay {
        session.play();
    }

    let commands = spawn_stdin_reader();
    let mut surface = TermSurface::new();
    let deadline = args
        .duration_limit
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    let mut stdin_open = true;

    loop {
        if stdin_open {
            match commands.try_recv() {
                Ok(line) => {
                    surface.release_line();
                    match command::parse(&line) {
                        Ok(Some(cmd)) => {
                            if run_command(&mut session, cmd) == Flow::Quit {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    }
                }
                Err(mpsc::TryRecvError::Empty) => {}
                // Piped stdin: no more commands are coming, so finish when
                // playback does
                Err(mpsc::TryRecvError::Disconnected) => stdin_open = false,
            }
        }
        session.pump(&mut surface);
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        if !stdin_open && !session.is_playing() {
            break;
        }
        std::thread::sleep(PUMP_INTERVAL);
    }

    surface.release_line();
    session.stop();
    if let Err(e) = save_config(&session.config_snapshot(), &config_path) {
        log::warn!("Could not save settings: {:#}", e);
    }
    log::info!("Bye");
    Ok(())
}

fn parse_args(args: &[String]) -> Result<PlayerArgs> {
    let mut parsed = PlayerArgs::default();
    let mut file = None;
    let mut words = args.iter().map(String::as_str);

    while let Some(word) = words.next() {
        match word {
            "--loop" => parsed.loop_enabled = true,
            "--autoplay" => parsed.autoplay = true,
            "--delete-mode" => parsed.delete_mode = true,
            "--region" => {
                parsed.region = Some((
                    value(&mut words, "--region START END")?,
                    value(&mut words, "--region START END")?,
                ));
            }
            "--profile" => {
                let name = words.next().context("--profile NAME")?;
                let profile = EnvelopeProfile::from_name(name)
                    .with_context(|| format!("unknown profile '{}'", name))?;
                parsed.profile = Some(profile);
            }
            "--volume" => parsed.volume = Some(value(&mut words, "--volume GAIN")?),
            "--fade-in" => parsed.fade_in = Some(value(&mut words, "--fade-in SECONDS")?),
            "--fade-out" => parsed.fade_out = Some(value(&mut words, "--fade-out SECONDS")?),
            "--duration-limit" => {
                let limit = value(&mut words, "--duration-limit SECONDS")?;
                if !limit.is_finite() || limit <= 0.0 {
                    bail!("--duration-limit must be a positive number of seconds");
                }
                parsed.duration_limit = Some(limit);
            }
            other if other.starts_with("--") => bail!("unknown flag {}\n{}", other, USAGE),
            other => {
                if file.replace(PathBuf::from(other)).is_some() {
                    bail!("more than one input file given");
                }
            }
        }
    }

    parsed.file = file.context(USAGE)?;
    Ok(parsed)
}

/// Parse the next word as the numeric value of a flag
fn value<'a>(words: &mut impl Iterator<Item = &'a str>, usage: &str) -> Result<f64> {
    let word = words.next().with_context(|| usage.to_string())?;
    word.parse::<f64>()
        .with_context(|| format!("'{}' is not a number", word))
}

/// Command-line flags override the persisted config for this run
fn apply_flag_overrides(session: &mut PreviewSession, args: &PlayerArgs) {
    let mut envelope = *session.envelope();
    if let Some(profile) = args.profile {
        envelope.profile = profile;
    }
    if let Some(volume) = args.volume {
        envelope.base_gain = volume;
    }
    if let Some(seconds) = args.fade_in {
        envelope.fade_in_seconds = seconds;
    }
    if let Some(seconds) = args.fade_out {
        envelope.fade_out_seconds = seconds;
    }
    session.set_envelope(envelope);
    if args.loop_enabled {
        session.set_loop_enabled(true);
    }
    if args.delete_mode {
        session.set_delete_mode(true);
    }
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

fn run_command(session: &mut PreviewSession, command: Command) -> Flow {
    match command {
        Command::Play => session.play(),
        Command::Pause => session.pause(),
        Command::Stop => session.stop(),
        Command::Toggle => session.toggle_play_pause(),
        Command::Seek(fraction) => session.seek_to(fraction),
        Command::Click(t) => session.click_timeline(t),
        Command::Start(t) => {
            if let Err(e) = session.set_region_start(t) {
                println!("{}", e);
            }
        }
        Command::End(t) => {
            if let Err(e) = session.set_region_end(t) {
                println!("{}", e);
            }
        }
        Command::Bounds(start, end) => {
            if !session.set_region_bounds(start, end) {
                println!("bounds rejected, region unchanged");
            }
        }
        Command::Loop(enabled) => session.set_loop_enabled(enabled),
        Command::Fade(fade_in, fade_out) => {
            session.toggle_fade(fade_in, fade_out);
        }
        Command::FadeIn(seconds) => session.set_fade_in_duration(seconds),
        Command::FadeOut(seconds) => session.set_fade_out_duration(seconds),
        Command::Profile(profile) => {
            let mut envelope = *session.envelope();
            envelope.profile = profile;
            session.set_envelope(envelope);
        }
        Command::Gain(gain) => {
            let mut envelope = *session.envelope();
            envelope.base_gain = gain;
            session.set_envelope(envelope);
        }
        Command::Delete(enabled) => session.set_delete_mode(enabled),
        Command::Status => print_status(session),
        Command::Help => print_help(),
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn print_status(session: &PreviewSession) {
    match session.current_region() {
        Some(region) => println!(
            "{} at {:.2}s, region [{:.2}s, {:.2}s], profile {}, loop {}",
            if session.is_playing() { "playing" } else { "paused" },
            session.position(),
            region.start,
            region.end,
            region.profile.name(),
            if session.loop_enabled() { "on" } else { "off" },
        ),
        None => println!("no track loaded"),
    }
}

fn print_help() {
    println!("commands:");
    println!("  play | pause | stop | toggle      transport control");
    println!("  seek <fraction>                   jump to a fraction of the track");
    println!("  click <seconds>                   timeline click (expands the region)");
    println!("  start <s> | end <s> | bounds a b  move the region");
    println!("  loop on|off                       repeat the region");
    println!("  profile <name> | gain <0..1>      envelope shape and level");
    println!("  fade on|off on|off                global fade-in/fade-out");
    println!("  fadein <s> | fadeout <s>          profile ramp lengths");
    println!("  delete on|off                     invert the dimmed spans");
    println!("  status | help | quit");
}

/// Stdin lines arrive on a channel so the pump loop never blocks
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_parses_full_flag_line() {
        let parsed = parse_args(&args(&[
            "take.wav",
            "--region",
            "2",
            "8.5",
            "--profile",
            "bell",
            "--volume",
            "0.8",
            "--loop",
            "--duration-limit",
            "30",
        ]))
        .unwrap();

        assert_eq!(parsed.file, PathBuf::from("take.wav"));
        assert_eq!(parsed.region, Some((2.0, 8.5)));
        assert_eq!(parsed.profile, Some(EnvelopeProfile::Bell));
        assert_eq!(parsed.volume, Some(0.8));
        assert!(parsed.loop_enabled);
        assert!(!parsed.autoplay);
        assert_eq!(parsed.duration_limit, Some(30.0));
    }

    #[test]
    fn test_file_alone_leaves_defaults() {
        let parsed = parse_args(&args(&["take.wav"])).unwrap();
        assert_eq!(
            parsed,
            PlayerArgs {
                file: PathBuf::from("take.wav"),
                ..PlayerArgs::default()
            }
        );
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["a.wav", "b.wav"])).is_err());
        assert!(parse_args(&args(&["a.wav", "--sideways"])).is_err());
        assert!(parse_args(&args(&["a.wav", "--region", "2"])).is_err());
        assert!(parse_args(&args(&["a.wav", "--profile", "warble"])).is_err());
        assert!(parse_args(&args(&["a.wav", "--duration-limit", "-5"])).is_err());
    }
}
