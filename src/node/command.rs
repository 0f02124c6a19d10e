//! Command interpreter
//!
//! Short textual commands sent to a node. The first whitespace-delimited
//! token selects the verb and the remainder is the argument. Execution
//! never fails: every outcome, including misuse, is a result string.

use std::fmt;
use std::str::FromStr;

use super::context::Shutdown;
use crate::common::Error;

/// Command type reserved for the coordinator itself
pub const MOMKAT: &str = "MOMKAT";
/// Command type broadcast to every peer
pub const ALL: &str = "ALL";

/// Who a queued command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Every registered peer
    All,
    /// Only the acting coordinator
    MomKat,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::All => f.write_str(ALL),
            CommandType::MomKat => f.write_str(MOMKAT),
        }
    }
}

impl FromStr for CommandType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim() {
            ALL => Ok(CommandType::All),
            MOMKAT => Ok(CommandType::MomKat),
            other => Err(Error::InvalidCommand(format!("unknown command type '{}'", other))),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WhoAreYou,
    Print(String),
    Kill(Option<String>),
    /// Reserved, not implemented
    List(Option<String>),
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (verb, arg) = match input.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, Some(rest.trim_start())),
            None => (input, None),
        };
        let arg = arg.filter(|a| !a.is_empty()).map(str::to_string);

        match verb {
            "$whoareu" => Command::WhoAreYou,
            "$print" => Command::Print(arg.unwrap_or_default()),
            "$kill" => Command::Kill(arg),
            "$list" => Command::List(arg),
            _ => Command::Unknown(input.to_string()),
        }
    }
}

/// Run `input` on behalf of the node `server_id`
pub fn execute(input: &str, server_id: &str, shutdown: &Shutdown) -> String {
    match Command::parse(input) {
        Command::WhoAreYou => format!("I'm a MeerKat: {}", server_id),
        Command::Print(text) => text,
        Command::Kill(Some(arg)) if arg == "you" => {
            shutdown.schedule();
            "exited!".to_string()
        }
        Command::Kill(Some(arg)) => format!("$kill - unknown target '{}', use: $kill you", arg),
        Command::Kill(None) => "$kill - needs an argument, use: $kill you".to_string(),
        Command::List(_) | Command::Unknown(_) => {
            format!("{} - is not a defined Command!", input.trim())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shutdown() -> Shutdown {
        Shutdown::new(Duration::from_secs(5))
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("$whoareu"), Command::WhoAreYou);
        assert_eq!(
            Command::parse("  $print  hello world"),
            Command::Print("hello world".into())
        );
        assert_eq!(Command::parse("$print"), Command::Print(String::new()));
        assert_eq!(Command::parse("$kill you"), Command::Kill(Some("you".into())));
        assert_eq!(Command::parse("$kill"), Command::Kill(None));
        assert_eq!(Command::parse("$list all"), Command::List(Some("all".into())));
        assert_eq!(Command::parse("$bogus 1"), Command::Unknown("$bogus 1".into()));
    }

    #[tokio::test]
    async fn test_dispatch_literals() {
        let sd = shutdown();
        assert!(execute("$whoareu", "node-7", &sd).contains("node-7"));
        assert_eq!(execute("$print hello world", "node-7", &sd), "hello world");
        assert_eq!(execute("", "node-7", &sd), " - is not a defined Command!");
        assert_eq!(execute("$bogus", "node-7", &sd), "$bogus - is not a defined Command!");
        assert_eq!(execute("$list", "node-7", &sd), "$list - is not a defined Command!");
        assert!(execute("$kill", "node-7", &sd).contains("$kill"));
        assert!(execute("$kill me", "node-7", &sd).contains("$kill"));
        assert!(!sd.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_kill_you_schedules_exit() {
        let sd = shutdown();
        let mut rx = sd.subscribe();
        let begin = tokio::time::Instant::now();

        assert_eq!(execute("$kill you", "node-7", &sd), "exited!");
        assert!(!sd.is_triggered());

        rx.wait_for(|stop| *stop).await.unwrap();
        assert!(begin.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn test_command_type() {
        assert_eq!("ALL".parse::<CommandType>().unwrap(), CommandType::All);
        assert_eq!("MOMKAT".parse::<CommandType>().unwrap(), CommandType::MomKat);
        assert!(matches!(
            "momkat".parse::<CommandType>(),
            Err(Error::InvalidCommand(_))
        ));
        assert_eq!(CommandType::MomKat.to_string(), MOMKAT);
    }
}
