use serde_json::Value;

use crate::types::Direction;

#[derive(Debug)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
    },
    Input {
        dir: Direction,
        seat: Option<usize>,
        player: Option<usize>,
    },
    Pause,
    Start {
        level: Option<u32>,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = match object.get("name") {
                None => String::new(),
                Some(value) => value.as_str()?.trim().to_string(),
            };
            Some(ParsedClientMessage::Hello { name })
        }
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            let seat = parse_optional_index(object.get("seat"), 3)?;
            let player = parse_optional_index(object.get("player"), 3)?;
            if seat.is_some() && player.is_some() {
                return None;
            }
            Some(ParsedClientMessage::Input { dir, seat, player })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "start" => {
            let level = match parse_optional_index(object.get("level"), u32::MAX as usize)? {
                None => None,
                Some(0) => return None,
                Some(level) => Some(level as u32),
            };
            Some(ParsedClientMessage::Start { level })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_optional_index(value: Option<&Value>, max: usize) -> Option<Option<usize>> {
    let Some(value) = value else {
        return Some(None);
    };
    let number = value.as_u64()?;
    let index = usize::try_from(number).ok()?;
    if index > max {
        return None;
    }
    Some(Some(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":" A "}"#)
            .expect("hello message should parse");
        match parsed {
            ParsedClientMessage::Hello { name } => assert_eq!(name, "A"),
            _ => panic!("expected hello message"),
        }
        assert!(matches!(
            parse_client_message(r#"{"type":"hello"}"#),
            Some(ParsedClientMessage::Hello { .. })
        ));
    }

    #[test]
    fn parse_input_with_seat() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"left","seat":2}"#)
            .expect("input should parse");
        match parsed {
            ParsedClientMessage::Input { dir, seat, player } => {
                assert_eq!(dir, Direction::Left);
                assert_eq!(seat, Some(2));
                assert_eq!(player, None);
            }
            _ => panic!("expected input message"),
        }
    }

    #[test]
    fn parse_input_rejects_bad_fields() {
        assert!(parse_client_message(r#"{"type":"input","dir":"invalid"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"up","seat":4}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"up","seat":-1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","dir":"up","player":1.5}"#).is_none());
        assert!(
            parse_client_message(r#"{"type":"input","dir":"up","seat":0,"player":0}"#).is_none()
        );
    }

    #[test]
    fn parse_start_and_pause() {
        assert!(matches!(
            parse_client_message(r#"{"type":"start"}"#),
            Some(ParsedClientMessage::Start { level: None })
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"start","level":5}"#),
            Some(ParsedClientMessage::Start { level: Some(5) })
        ));
        assert!(parse_client_message(r#"{"type":"start","level":0}"#).is_none());
        assert!(matches!(
            parse_client_message(r#"{"type":"pause"}"#),
            Some(ParsedClientMessage::Pause)
        ));
    }

    #[test]
    fn parse_ping_requires_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"x"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"unknown"}"#).is_none());
    }
}
