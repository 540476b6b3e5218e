//! Parsing of the opaque per-character move JSON into commands.

use serde_json::Value;
use tracing::warn;

use crate::coord::HexCoord;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Prospect,
    SetWaypoints(Vec<HexCoord>),
}

/// Extracts the recognised commands from a move, in the order they are
/// applied. Anything malformed is dropped with a warning.
pub fn parse_update(upd: &Value) -> Vec<Command> {
    let Some(obj) = upd.as_object() else {
        warn!(target: "prospect_core.command", %upd, "character update is not an object");
        return Vec::new();
    };

    let mut commands = Vec::new();
    if let Some(cmd) = obj.get("prospect") {
        match cmd.as_object() {
            Some(inner) if inner.is_empty() => commands.push(Command::Prospect),
            _ => warn!(target: "prospect_core.command", %cmd, "invalid prospecting command"),
        }
    }
    if let Some(wp) = obj.get("wp") {
        match serde_json::from_value::<Vec<HexCoord>>(wp.clone()) {
            Ok(points) => commands.push(Command::SetWaypoints(points)),
            Err(err) => warn!(target: "prospect_core.command", %wp, %err, "invalid waypoints"),
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognises_both_shapes() {
        assert_eq!(parse_update(&json!({"prospect": {}})), vec![Command::Prospect]);
        assert_eq!(
            parse_update(&json!({"wp": [{"x": 1, "y": -2}]})),
            vec![Command::SetWaypoints(vec![HexCoord::new(1, -2)])]
        );
        assert_eq!(
            parse_update(&json!({"wp": [], "prospect": {}})),
            vec![Command::Prospect, Command::SetWaypoints(Vec::new())]
        );
    }

    #[test]
    fn drops_malformed_commands() {
        assert!(parse_update(&json!({"prospect": {"x": 1}})).is_empty());
        assert!(parse_update(&json!({"prospect": true})).is_empty());
        assert!(parse_update(&json!({"wp": [{"x": "a"}]})).is_empty());
        assert!(parse_update(&json!([1, 2])).is_empty());
        assert!(parse_update(&json!({"foo": {}})).is_empty());
    }
}
