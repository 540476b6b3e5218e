//! Scripted scenarios driving a [`RegtestNode`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use prospect_core::{AdminCommand, BlockHash, Faction, HexCoord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::HarnessError;
use crate::node::RegtestNode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Spawn {
        name: String,
        faction: Faction,
        position: HexCoord,
    },
    Move {
        character: String,
        waypoints: Vec<HexCoord>,
    },
    Prospect {
        character: String,
    },
    /// Raw move JSON, passed through unparsed.
    Send {
        character: String,
        cmd: serde_json::Value,
    },
    Teleport {
        character: String,
        position: HexCoord,
    },
    SetHp {
        character: String,
        hp: u32,
    },
    Damage {
        character: String,
        amount: u32,
    },
    Generate {
        blocks: usize,
    },
    Mark {
        label: String,
    },
    Invalidate {
        label: String,
    },
    Reconsider {
        label: String,
    },
}

impl Step {
    pub fn is_reorg(&self) -> bool {
        matches!(self, Step::Invalidate { .. } | Step::Reconsider { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Reads a scenario from a `.toml` or `.json` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let mut scenario: Scenario = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&data)
                .with_context(|| format!("invalid scenario {}", path.display()))?,
            _ => serde_json::from_str(&data)
                .with_context(|| format!("invalid scenario {}", path.display()))?,
        };
        if scenario.name.is_empty() {
            scenario.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("scenario")
                .to_owned();
        }
        Ok(scenario)
    }

    pub fn run(&self, node: &mut RegtestNode) -> Result<(), HarnessError> {
        self.run_with(node, |_, _| Ok(()))
    }

    /// Runs all steps, calling `inspect` after each one.
    pub fn run_with<F>(&self, node: &mut RegtestNode, mut inspect: F) -> Result<(), HarnessError>
    where
        F: FnMut(&Step, &RegtestNode) -> Result<(), HarnessError>,
    {
        let mut marks: BTreeMap<String, BlockHash> = BTreeMap::new();
        info!(target: "regtest_harness.scenario", name = %self.name, steps = self.steps.len(), "running scenario");
        for step in &self.steps {
            apply_step(node, step, &mut marks)?;
            inspect(step, node)?;
        }
        Ok(())
    }
}

fn apply_step(
    node: &mut RegtestNode,
    step: &Step,
    marks: &mut BTreeMap<String, BlockHash>,
) -> Result<(), HarnessError> {
    let marked = |label: &str, marks: &BTreeMap<String, BlockHash>| {
        marks
            .get(label)
            .copied()
            .ok_or_else(|| HarnessError::UnknownLabel(label.to_owned()))
    };

    match step {
        Step::Spawn {
            name,
            faction,
            position,
        } => node.spawn(name.clone(), *faction, *position),
        Step::Move {
            character,
            waypoints,
        } => {
            let id = node.character_id(character)?;
            node.send_move(id, json!({ "wp": waypoints }));
        }
        Step::Prospect { character } => {
            let id = node.character_id(character)?;
            node.send_move(id, json!({ "prospect": {} }));
        }
        Step::Send { character, cmd } => {
            let id = node.character_id(character)?;
            node.send_move(id, cmd.clone());
        }
        Step::Teleport {
            character,
            position,
        } => {
            let id = node.character_id(character)?;
            node.admin(AdminCommand::Teleport {
                character: id,
                position: *position,
            });
        }
        Step::SetHp { character, hp } => {
            let id = node.character_id(character)?;
            node.admin(AdminCommand::SetHp {
                character: id,
                hp: *hp,
            });
        }
        Step::Damage { character, amount } => {
            let id = node.character_id(character)?;
            node.damage(id, *amount);
        }
        Step::Generate { blocks } => {
            node.generate(*blocks)?;
        }
        Step::Mark { label } => {
            marks.insert(label.clone(), node.get_best_block_hash());
        }
        Step::Invalidate { label } => {
            let hash = marked(label, marks)?;
            node.invalidate_block(&hash)?;
        }
        Step::Reconsider { label } => {
            let hash = marked(label, marks)?;
            node.reconsider_block(&hash)?;
        }
    }
    Ok(())
}
