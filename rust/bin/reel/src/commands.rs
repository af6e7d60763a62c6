//! Terminal command parsing and dispatch.

use reel_story::{Key, MediaEvent, ViewerError, ViewerHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Prev,
    Pause,
    Tap(f64),
    Author(usize),
    Like,
    Follow,
    Comments,
    Hide,
    Say(String),
    Media(String, MediaEvent),
    Refresh,
    Quit,
    Help,
}

pub const HELP: &str = "\
commands:
  n | next            next story          p | prev        previous story
  space | pause       toggle pause        tap <0..1>      tap at a width fraction
  author <index>      jump to an author   refresh         reload the catalog
  like | follow       toggle like/follow  c | comments    open comments
  hide                close comments      say <text>      post a comment
  ended <story>       report video end    q | quit        close the viewer";

/// Parse one input line. `None` for an unknown or malformed command.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    Some(match word {
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Prev,
        "" | "space" | "pause" => Command::Pause,
        "tap" => Command::Tap(rest.parse().ok()?),
        "author" => Command::Author(rest.parse().ok()?),
        "like" => Command::Like,
        "follow" => Command::Follow,
        "c" | "comments" => Command::Comments,
        "hide" => Command::Hide,
        "say" if !rest.is_empty() => Command::Say(rest.to_string()),
        "ended" if !rest.is_empty() => Command::Media(rest.to_string(), MediaEvent::Ended),
        "refresh" => Command::Refresh,
        "q" | "quit" => Command::Quit,
        "h" | "help" | "?" => Command::Help,
        _ => return None,
    })
}

/// Forward a command to the viewer.
pub async fn run(handle: &ViewerHandle, command: Command) -> Result<(), ViewerError> {
    match command {
        Command::Next => handle.key(Key::Right),
        Command::Prev => handle.key(Key::Left),
        Command::Pause => handle.key(Key::Space),
        Command::Tap(x) => handle.tap(x),
        Command::Author(index) => handle.jump_to_author(index),
        Command::Like => handle.toggle_like(),
        Command::Follow => handle.toggle_follow(),
        Command::Comments => handle.open_comments(),
        Command::Hide => handle.close_comments(),
        Command::Say(text) => {
            handle.set_draft(text)?;
            handle.submit_comment().await
        }
        Command::Media(story_id, event) => handle.media(story_id, event),
        Command::Refresh => handle.refresh(),
        Command::Quit => handle.close(),
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_words() {
        assert_eq!(parse("n"), Some(Command::Next));
        assert_eq!(parse("  prev "), Some(Command::Prev));
        assert_eq!(parse(""), Some(Command::Pause));
        assert_eq!(parse("tap 0.8"), Some(Command::Tap(0.8)));
        assert_eq!(parse("author 2"), Some(Command::Author(2)));
        assert_eq!(parse("say  nice shot "), Some(Command::Say("nice shot".into())));
        assert_eq!(
            parse("ended V1"),
            Some(Command::Media("V1".into(), MediaEvent::Ended))
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(parse("tap left"), None);
        assert_eq!(parse("author"), None);
        assert_eq!(parse("say"), None);
        assert_eq!(parse("dance"), None);
    }
}
