//! Line commands for the player REPL
//!
//! One command per stdin line, word-based. Parsing is separate from
//! execution so the loop in `main` stays a plain dispatch table.

use anyhow::{bail, Context, Result};

use excerpt_core::envelope::EnvelopeProfile;
use excerpt_core::Seconds;

/// A parsed REPL line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Toggle,
    /// Seek to a fraction of the whole track
    Seek(f64),
    /// Timeline click at an absolute time
    Click(Seconds),
    /// Move the region start
    Start(Seconds),
    /// Move the region end
    End(Seconds),
    /// Replace both bounds
    Bounds(Seconds, Seconds),
    Loop(bool),
    /// Global fade toggles `(fade_in, fade_out)`
    Fade(bool, bool),
    FadeIn(Seconds),
    FadeOut(Seconds),
    Profile(EnvelopeProfile),
    Gain(f64),
    Delete(bool),
    Status,
    Help,
    Quit,
}

/// Parse one input line; blank lines are `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };

    let command = match word {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "toggle" | "t" => Command::Toggle,
        "seek" => Command::Seek(number(&mut words, "seek <fraction>")?),
        "click" => Command::Click(number(&mut words, "click <seconds>")?),
        "start" => Command::Start(number(&mut words, "start <seconds>")?),
        "end" => Command::End(number(&mut words, "end <seconds>")?),
        "bounds" => Command::Bounds(
            number(&mut words, "bounds <start> <end>")?,
            number(&mut words, "bounds <start> <end>")?,
        ),
        "loop" => Command::Loop(flag(&mut words, "loop on|off")?),
        "fade" => Command::Fade(
            flag(&mut words, "fade on|off on|off")?,
            flag(&mut words, "fade on|off on|off")?,
        ),
        "fadein" => Command::FadeIn(number(&mut words, "fadein <seconds>")?),
        "fadeout" => Command::FadeOut(number(&mut words, "fadeout <seconds>")?),
        "profile" => {
            let name = words.next().context("profile <name>")?;
            let profile = EnvelopeProfile::from_name(name)
                .with_context(|| format!("unknown profile '{}'", name))?;
            Command::Profile(profile)
        }
        "gain" => Command::Gain(number(&mut words, "gain <0..1>")?),
        "delete" => Command::Delete(flag(&mut words, "delete on|off")?),
        "status" | "s" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument '{}'", extra);
    }
    Ok(Some(command))
}

fn number<'a>(words: &mut impl Iterator<Item = &'a str>, usage: &str) -> Result<f64> {
    let word = words.next().with_context(|| usage.to_string())?;
    word.parse::<f64>()
        .with_context(|| format!("'{}' is not a number", word))
}

fn flag<'a>(words: &mut impl Iterator<Item = &'a str>, usage: &str) -> Result<bool> {
    match words.next().with_context(|| usage.to_string())? {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("expected on|off, got '{}'", other),
    }
}
