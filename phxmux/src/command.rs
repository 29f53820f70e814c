use anyhow::{anyhow, Result};
use phxmux_codec::frame::{chat, delivery, feed};

pub(crate) const HELP: &str = "\
connect [token]                      open the socket (token defaults to the configured one)
disconnect                           close the socket
chat join|leave <room>               join or leave chat:room_<room>
chat send <room> <text...>           send a message to a room
feed join|leave <user>               join or leave feed:user_<user>
feed view|like|save <user> <product> send a feed action
delivery join|leave <id>             join or leave delivery:delivery_<id>
delivery location <id> <lat> <lng>   send a location update
status                               show the connection and the topics
help                                 show this help
quit                                 close the socket and exit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Namespace {
    Chat,
    Feed,
    Delivery,
}

impl Namespace {
    pub(crate) fn topic(&self, id: &str) -> String {
        match self {
            Namespace::Chat => chat::room(id),
            Namespace::Feed => feed::user(id),
            Namespace::Delivery => delivery::tracker(id),
        }
    }

    /// Events pushed by the server on the topics of the namespace.
    pub(crate) fn inbound_events(&self) -> &'static [&'static str] {
        match self {
            Namespace::Chat => &[chat::MESSAGE],
            Namespace::Feed => &[feed::NEW_ITEM, feed::LIKE_UPDATE],
            Namespace::Delivery => &[delivery::LOCATION_UPDATE],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeedAction {
    View,
    Like,
    Save,
}

impl FeedAction {
    pub(crate) fn event(&self) -> &'static str {
        match self {
            FeedAction::View => feed::VIEW_ITEM,
            FeedAction::Like => feed::LIKE_ITEM,
            FeedAction::Save => feed::SAVE_ITEM,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Command {
    Connect(Option<String>),
    Disconnect,
    Join(Namespace, String),
    Leave(Namespace, String),
    ChatSend {
        room: String,
        content: String,
    },
    Feed {
        action: FeedAction,
        user: String,
        product: String,
    },
    Location {
        id: String,
        latitude: f64,
        longitude: f64,
    },
    Status,
    Help,
    Quit,
}

/// Parses a command line, `None` for an empty line. Incomplete commands are
/// rejected here, so nothing is sent for them.
pub(crate) fn parse(line: &str) -> Result<Option<Command>> {
    let words: Vec<&str> = line.split_whitespace().collect();

    let cmd = match words.as_slice() {
        [] => return Ok(None),
        ["connect"] => Command::Connect(None),
        ["connect", token] => Command::Connect(Some(token.to_string())),
        ["disconnect"] => Command::Disconnect,
        ["status"] => Command::Status,
        ["help"] => Command::Help,
        ["quit"] | ["exit"] => Command::Quit,
        [ns, rest @ ..] if namespace(ns).is_some() => {
            let ns = namespace(ns).ok_or_else(|| anyhow!("unknown namespace {}", ns))?;

            parse_topic_command(ns, rest)?
        }
        [other, ..] => return Err(anyhow!("unknown command {}, try help", other)),
    };

    Ok(Some(cmd))
}

fn namespace(word: &str) -> Option<Namespace> {
    match word {
        "chat" => Some(Namespace::Chat),
        "feed" => Some(Namespace::Feed),
        "delivery" => Some(Namespace::Delivery),
        _ => None,
    }
}

fn parse_topic_command(ns: Namespace, words: &[&str]) -> Result<Command> {
    let cmd = match (ns, words) {
        (_, ["join", id]) => Command::Join(ns, id.to_string()),
        (_, ["leave", id]) => Command::Leave(ns, id.to_string()),
        (Namespace::Chat, ["send", room, text @ ..]) if !text.is_empty() => Command::ChatSend {
            room: room.to_string(),
            content: text.join(" "),
        },
        (Namespace::Feed, [action @ ("view" | "like" | "save"), user, product]) => Command::Feed {
            action: match *action {
                "view" => FeedAction::View,
                "like" => FeedAction::Like,
                _ => FeedAction::Save,
            },
            user: user.to_string(),
            product: product.to_string(),
        },
        (Namespace::Delivery, ["location", id, lat, lng]) => Command::Location {
            id: id.to_string(),
            latitude: coordinate(lat)?,
            longitude: coordinate(lng)?,
        },
        _ => return Err(anyhow!("invalid arguments, try help")),
    };

    Ok(cmd)
}

fn coordinate(word: &str) -> Result<f64> {
    match word.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(anyhow!("{} is not a valid coordinate", word)),
    }
}
