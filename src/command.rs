//! Parsing for the text payloads carried by JOIN, PLACE and FIRE frames.

use crate::common::{Coord, GameRuleError};
use crate::config::BOARD_SIZE;
use crate::ship::{Orientation, ShipClass};

/// A JOIN payload: a display name for a fresh seat, or a resume token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinRequest {
    Fresh { name: String },
    Resume { token: String },
}

/// Split a client input line into its leading verb and the remainder.
pub fn split_verb(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(at) => (&line[..at], line[at..].trim_start()),
        None => (line, ""),
    }
}

/// Drop a leading verb echoed into a payload (e.g. `fire E6` in a FIRE
/// frame), case-insensitively.
pub fn strip_verb<'a>(payload: &'a str, verb: &str) -> &'a str {
    let (first, rest) = split_verb(payload);
    if first.eq_ignore_ascii_case(verb) {
        rest
    } else {
        payload.trim()
    }
}

/// JOIN payloads never fail to parse: an empty name falls back to
/// "Anonymous", and `resume <token>` asks to pick up an abandoned seat.
pub fn parse_join(payload: &str) -> JoinRequest {
    let mut words = payload.split_whitespace();
    if let Some(first) = words.next() {
        if first.eq_ignore_ascii_case("resume") {
            if let Some(token) = words.next() {
                return JoinRequest::Resume {
                    token: token.to_string(),
                };
            }
        }
    }
    let name = payload.trim();
    if name.is_empty() {
        JoinRequest::Fresh {
            name: "Anonymous".to_string(),
        }
    } else {
        JoinRequest::Fresh {
            name: name.to_string(),
        }
    }
}

/// PLACE payload: `<coordinate> <H|V> <ship name>`, e.g. `E6 H Carrier`.
pub fn parse_place(payload: &str) -> Result<(ShipClass, Coord, Orientation), GameRuleError> {
    let mut words = payload.split_whitespace();
    let coord_word = words
        .next()
        .ok_or(GameRuleError::MissingArgument("coordinate"))?;
    let orient_word = words
        .next()
        .ok_or(GameRuleError::MissingArgument("orientation"))?;
    let ship_word = words
        .next()
        .ok_or(GameRuleError::MissingArgument("ship name"))?;
    let coord = parse_coordinate(coord_word)?;
    let orientation = Orientation::parse(orient_word)?;
    let class = ShipClass::by_name(ship_word)
        .ok_or_else(|| GameRuleError::UnknownShip(ship_word.to_string()))?;
    Ok((class, coord, orientation))
}

/// FIRE payload: a single coordinate, e.g. `E6`.
pub fn parse_fire(payload: &str) -> Result<Coord, GameRuleError> {
    let word = payload
        .split_whitespace()
        .next()
        .ok_or(GameRuleError::MissingArgument("coordinate"))?;
    parse_coordinate(word)
}

/// Coordinates read column-letter first: `E6` is column E, row 6.
pub fn parse_coordinate(text: &str) -> Result<Coord, GameRuleError> {
    let bad = || GameRuleError::BadCoordinate(text.to_string());
    let mut chars = text.chars();
    let letter = chars.next().ok_or_else(bad)?;
    if !letter.is_ascii_alphabetic() {
        return Err(bad());
    }
    let col = letter.to_ascii_uppercase() as u8 - b'A';
    let number: u8 = chars.as_str().parse().map_err(|_| bad())?;
    if col >= BOARD_SIZE || number == 0 || number > BOARD_SIZE {
        return Err(bad());
    }
    Ok(Coord::new(number - 1, col))
}
