//! Command parsing
//!
//! `/name[@bot] args...` -> `Command`. Names are case-insensitive; each
//! operation has its original chat name plus a descriptive alias.

/// Bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// -10 to the reply/mention target
    Lower,
    /// +10 to the reply/mention target
    Raise,
    /// -10 to the designated subject
    GlobalLower,
    /// +10 to the designated subject
    GlobalRaise,
    /// `/danila <word>` with a word other than `klass`
    GlobalUsage,
    /// Designated subject's rating and tier
    Status,
    /// Invoker's own rating and tier
    MyStatus,
    /// Zero the designated subject's rating
    Reset,
    Help,
}

/// Parsed command plus its argument words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Command,
    pub args: Vec<String>,
}

pub const HELP_TEXT: &str = "📋 Команды бота:

/danilalox — минус 10 к рейтингу Данилы
/danilaklass — плюс 10 к рейтингу Данилы
/danilarating — рейтинг Данилы
/my — мой рейтинг
/minus — ответь на сообщение или укажи @username: -10
/plus — ответь на сообщение или укажи @username: +10
Реакция 🤡 на сообщение — -10 автору
Реакция 🔥 на сообщение — +10 автору
/help — этот список";

impl Command {
    /// Parse message text. Returns None for non-commands, unknown commands and
    /// commands addressed to a bot other than `bot_username`.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<ParsedCommand> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut words = text.split_whitespace();
        let head = words.next()?;
        let args: Vec<String> = words.map(|w| w.to_string()).collect();

        // "/cmd@SomeBot" -> "cmd"
        let (name, addressee) = match head[1..].split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (&head[1..], None),
        };
        if let (Some(addressee), Some(me)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                return None;
            }
        }
        let name = name.to_lowercase();

        let command = match name.as_str() {
            "minus" | "lower" => Self::Lower,
            "plus" | "raise" => Self::Raise,
            "danilalox" | "global_lower" => Self::GlobalLower,
            "danilaklass" | "global_raise" => Self::GlobalRaise,
            "danila" => match args.first() {
                Some(word) if word.eq_ignore_ascii_case("klass") => Self::GlobalRaise,
                _ => Self::GlobalUsage,
            },
            "danilarating" | "status" => Self::Status,
            "my" | "my_status" => Self::MyStatus,
            "clear" | "reset" => Self::Reset,
            "help" | "start" => Self::Help,
            _ => return None,
        };

        Some(ParsedCommand { command, args })
    }

    /// Signed step for adjustment commands
    pub fn delta(&self) -> Option<i64> {
        match self {
            Self::Lower | Self::GlobalLower => Some(-crate::RATING_STEP),
            Self::Raise | Self::GlobalRaise => Some(crate::RATING_STEP),
            _ => None,
        }
    }

    /// Usage hint shown when no target can be resolved
    pub fn usage_hint(&self) -> &'static str {
        match self {
            Self::Lower => "Ответь /minus на чьё-то сообщение или укажи @username",
            Self::Raise => "Ответь /plus на чьё-то сообщение или укажи @username",
            Self::GlobalUsage => "Использование: /danila klass — +10 к рейтингу",
            _ => HELP_TEXT,
        }
    }
}
