use chrono::NaiveDate;

use crate::model::{BookingForm, BookingId, Ms, Point};
use crate::timeline::parse_key;

/// One line of a driver script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scroll { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    Toggle { group_id: String },
    /// Empty term clears the search.
    Search { term: String },
    BookingFilter { needle: String },
    Down { resource_id: String, date: NaiveDate },
    Enter { at: Ms, resource_id: String, date: NaiveDate },
    Up,
    Confirm { form: BookingForm },
    Cancel,
    Grab { booking_id: BookingId, at: Point, time: Ms },
    Move { at: Point, time: Ms },
    Release { at: Point, time: Ms },
    Tick { time: Ms },
    Render,
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    Parse(String),
    /// Blank line or comment.
    Empty,
    UnknownCommand(String),
    WrongArity(&'static str, usize, usize),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Parse(s) => write!(f, "parse error: {s}"),
            ScriptError::Empty => write!(f, "empty line"),
            ScriptError::UnknownCommand(c) => write!(f, "unknown command: {c}"),
            ScriptError::WrongArity(cmd, expected, got) => {
                write!(f, "{cmd}: expected {expected} arguments, got {got}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Parse one script line. `#` starts a comment.
///
/// ```text
/// resize 1350 300
/// down R1 2024-01-05
/// enter 16 R1 2024-01-08
/// up
/// confirm Smith | late arrival
/// grab 42 210 125 0
/// move 330 175 10
/// release 330 175 20
/// ```
pub fn parse_command(line: &str) -> Result<Command, ScriptError> {
    let line = line.split_once('#').map_or(line, |(code, _)| code).trim();
    if line.is_empty() {
        return Err(ScriptError::Empty);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    match verb.to_ascii_lowercase().as_str() {
        "scroll" => {
            arity("scroll", &args, 2)?;
            Ok(Command::Scroll {
                x: parse_f64(args[0])?,
                y: parse_f64(args[1])?,
            })
        }
        "resize" => {
            arity("resize", &args, 2)?;
            Ok(Command::Resize {
                width: parse_f64(args[0])?,
                height: parse_f64(args[1])?,
            })
        }
        "toggle" => {
            arity("toggle", &args, 1)?;
            Ok(Command::Toggle {
                group_id: args[0].to_string(),
            })
        }
        "search" => Ok(Command::Search { term: rest.to_string() }),
        "booking" => Ok(Command::BookingFilter {
            needle: rest.to_string(),
        }),
        "down" => {
            arity("down", &args, 2)?;
            Ok(Command::Down {
                resource_id: args[0].to_string(),
                date: parse_date(args[1])?,
            })
        }
        "enter" => {
            arity("enter", &args, 3)?;
            Ok(Command::Enter {
                at: parse_ms(args[0])?,
                resource_id: args[1].to_string(),
                date: parse_date(args[2])?,
            })
        }
        "up" => {
            arity("up", &args, 0)?;
            Ok(Command::Up)
        }
        "confirm" => {
            let (text, notes) = rest.split_once('|').unwrap_or((rest, ""));
            Ok(Command::Confirm {
                form: BookingForm {
                    text: text.trim().to_string(),
                    notes: notes.trim().to_string(),
                },
            })
        }
        "cancel" => {
            arity("cancel", &args, 0)?;
            Ok(Command::Cancel)
        }
        "grab" => {
            arity("grab", &args, 4)?;
            Ok(Command::Grab {
                booking_id: BookingId::from(args[0]),
                at: Point::new(parse_f64(args[1])?, parse_f64(args[2])?),
                time: parse_ms(args[3])?,
            })
        }
        "move" => {
            arity("move", &args, 3)?;
            Ok(Command::Move {
                at: Point::new(parse_f64(args[0])?, parse_f64(args[1])?),
                time: parse_ms(args[2])?,
            })
        }
        "release" => {
            arity("release", &args, 3)?;
            Ok(Command::Release {
                at: Point::new(parse_f64(args[0])?, parse_f64(args[1])?),
                time: parse_ms(args[2])?,
            })
        }
        "tick" => {
            arity("tick", &args, 1)?;
            Ok(Command::Tick {
                time: parse_ms(args[0])?,
            })
        }
        "render" => Ok(Command::Render),
        "reload" => Ok(Command::Reload),
        other => Err(ScriptError::UnknownCommand(other.to_string())),
    }
}

fn arity(cmd: &'static str, args: &[&str], expected: usize) -> Result<(), ScriptError> {
    if args.len() != expected {
        return Err(ScriptError::WrongArity(cmd, expected, args.len()));
    }
    Ok(())
}

fn parse_f64(s: &str) -> Result<f64, ScriptError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScriptError::Parse(format!("not a number: {s}")))
}

fn parse_ms(s: &str) -> Result<Ms, ScriptError> {
    s.parse()
        .map_err(|_| ScriptError::Parse(format!("not a timestamp: {s}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, ScriptError> {
    parse_key(s).ok_or_else(|| ScriptError::Parse(format!("not a YYYY-MM-DD date: {s}")))
}
