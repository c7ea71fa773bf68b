use std::collections::BTreeMap;
use std::time::Duration;

use jobwatch_core::Msg;

/// One line typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Page(u32),
    Dismiss,
    Detail,
    Refresh,
    /// `f key=value ...`; a bare `f` clears every filter.
    Filter(BTreeMap<String, String>),
    Interval(Duration),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands: n next page | p previous page | <number> go to page | d dismiss notice
          g open finished job | r refresh | f key=value filter | i <ms> poll interval (0 = manual)
          h help | q quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match head {
            "n" => Command::Next,
            "p" => Command::Previous,
            "d" => Command::Dismiss,
            "g" => Command::Detail,
            "r" => Command::Refresh,
            "h" | "?" => Command::Help,
            "q" => Command::Quit,
            "f" => {
                let mut filters = BTreeMap::new();
                for pair in words.by_ref() {
                    let (name, value) = pair
                        .split_once('=')
                        .filter(|(name, _)| !name.is_empty())
                        .ok_or_else(|| format!("expected key=value, got {pair:?}"))?;
                    filters.insert(name.to_string(), value.to_string());
                }
                Command::Filter(filters)
            }
            "i" => {
                let raw = words
                    .next()
                    .ok_or_else(|| "usage: i <milliseconds>".to_string())?;
                let ms: u64 = raw
                    .parse()
                    .map_err(|_| format!("not a number of milliseconds: {raw:?}"))?;
                Command::Interval(Duration::from_millis(ms))
            }
            number => match number.parse::<u32>() {
                Ok(page) => Command::Page(page),
                Err(_) => return Err(format!("unknown command {number:?}")),
            },
        };

        if words.next().is_some() {
            return Err(format!("unexpected arguments after {head:?}"));
        }
        Ok(command)
    }

    /// The list message this command stands for, if it is one.
    pub fn to_msg<S>(&self) -> Option<Msg<S>> {
        match self {
            Command::Next => Some(Msg::NextPage),
            Command::Previous => Some(Msg::PreviousPage),
            Command::Page(page) => Some(Msg::PageRequested(*page)),
            Command::Dismiss => Some(Msg::DismissClicked),
            Command::Detail => Some(Msg::GoToDetailClicked),
            Command::Refresh => Some(Msg::RefreshClicked),
            Command::Filter(filters) => Some(Msg::FiltersChanged(filters.clone())),
            Command::Interval(_) | Command::Help | Command::Quit => None,
        }
    }
}
