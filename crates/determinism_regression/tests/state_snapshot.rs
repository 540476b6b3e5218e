use prospect_core::{
    AdminCommand, BlockData, BlockHash, CharacterId, Engine, EngineParams, Faction, HexCoord,
    MoveData,
};
use serde_json::json;

fn block(engine: &Engine, admin: Vec<AdminCommand>, moves: Vec<MoveData>) -> BlockData {
    let height = engine.height() + 1;
    BlockData {
        height,
        hash: BlockHash::from_bytes([height as u8; 32]),
        parent: engine.best_hash(),
        moves,
        admin,
        damage: Vec::new(),
    }
}

#[test]
fn prospecting_state_snapshot() {
    let mut engine = Engine::new(EngineParams::default(), 0, BlockHash::default()).unwrap();
    let spawns = vec![
        AdminCommand::Spawn {
            name: "alice".into(),
            faction: Faction::Red,
            position: HexCoord::new(20, 40),
        },
        AdminCommand::Spawn {
            name: "bob".into(),
            faction: Faction::Blue,
            position: HexCoord::new(0, 0),
        },
    ];
    let b1 = block(&engine, spawns, Vec::new());
    engine.process_block(&b1).unwrap();

    let moves = vec![
        MoveData {
            character: CharacterId(1),
            cmd: json!({"prospect": {}}),
        },
        MoveData {
            character: CharacterId(2),
            cmd: json!({"wp": [{"x": 3, "y": 0}]}),
        },
    ];
    let b2 = block(&engine, Vec::new(), moves);
    engine.process_block(&b2).unwrap();

    let state = engine.state_json();
    insta::assert_json_snapshot!(state["characters"], @r###"
    [
      {
        "busy": {
          "blocks": 10,
          "operation": "prospecting",
          "region": 4294967298
        },
        "faction": "r",
        "hp": 100,
        "id": 1,
        "moving": false,
        "name": "alice",
        "position": {
          "x": 20,
          "y": 40
        }
      },
      {
        "busy": null,
        "faction": "b",
        "hp": 100,
        "id": 2,
        "moving": true,
        "name": "bob",
        "position": {
          "x": 0,
          "y": 0
        }
      }
    ]
    "###);
    insta::assert_json_snapshot!(state["regions"], @r###"
    [
      {
        "id": 4294967298,
        "prospection": {
          "inprogress": 1
        }
      }
    ]
    "###);
}
