use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use prospect_core::{EngineParams, GameState, Prospection, RegionId};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::node::RegtestNode;
use crate::report::{CheckResult, CheckStatus, ScenarioReport};
use crate::scenario::Scenario;

pub struct CheckOptions {
    pub workspace_root: PathBuf,
    pub run_id: String,
}

impl CheckOptions {
    pub fn new(workspace_root: PathBuf, run_id: impl Into<String>) -> Self {
        Self {
            workspace_root,
            run_id: run_id.into(),
        }
    }
}

pub fn run_checks(config: &HarnessConfig, options: &CheckOptions) -> Result<ScenarioReport> {
    config.validate_sources()?;
    let params = config.engine_params()?;
    let toggles = &config.checks;
    let mut checks = Vec::new();

    let paths = discover_scenarios(&config.sources.scenarios)?;
    if paths.is_empty() {
        warn!(target: "regtest_harness.checks", path = %config.sources.scenarios.display(), "no scenarios found");
    }
    for path in &paths {
        let scenario = Scenario::from_path(path)?;
        info!(target: "regtest_harness.checks", scenario = %scenario.name, "checking scenario");
        if toggles.invariants_enabled() {
            checks.push(check_scenario_invariants(&scenario, &params));
        }
        if toggles.replay_enabled() {
            checks.push(check_replay(&scenario, &params));
        }
        if toggles.reorg_enabled() {
            checks.push(check_reorg(&scenario, &params));
        }
    }

    let notes = format!(
        "{} scenario(s) under {}",
        paths.len(),
        options.workspace_root.display()
    );
    Ok(ScenarioReport::new(
        options.run_id.clone(),
        config.source_info(),
        checks,
        notes,
    ))
}

/// Scenario files under `root`, sorted by path. A file is returned as is.
pub fn discover_scenarios(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| filter_entry(e.path()))
    {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "toml")
        {
            found.push(path.to_path_buf());
        }
    }
    Ok(found)
}

fn filter_entry(path: &Path) -> bool {
    let ignored = ["target", ".git", "reports"];
    for part in path.components() {
        if let std::path::Component::Normal(os_str) = part {
            if let Some(part_str) = os_str.to_str() {
                if ignored.contains(&part_str) {
                    return false;
                }
            }
        }
    }
    true
}

/// Structural invariants that must hold after every block.
pub fn check_invariants(state: &GameState, params: &EngineParams) -> Vec<String> {
    let mut violations = Vec::new();
    let mut claims: BTreeMap<RegionId, u64> = BTreeMap::new();

    for c in state.characters.iter() {
        let Some(busy) = &c.busy else { continue };
        let Some(region) = busy.region else { continue };
        *claims.entry(region).or_insert(0) += 1;
        let record = state.regions.get(region);
        if record.claimant() != Some(c.id) {
            violations.push(format!(
                "character {} prospects region {} without holding its claim",
                c.id, region
            ));
        }
    }
    for (region, count) in &claims {
        if *count > 1 {
            violations.push(format!("region {region} has {count} prospectors"));
        }
    }

    let mut awarded: BTreeMap<_, u32> = BTreeMap::new();
    for region in state.regions.iter() {
        match &region.prospection {
            Some(Prospection::InProgress { in_progress }) => {
                let holder = state.characters.get(*in_progress);
                let coherent = holder
                    .and_then(|c| c.busy.as_ref())
                    .is_some_and(|b| b.region == Some(region.id));
                if !coherent {
                    violations.push(format!(
                        "region {} claimed by {} who is not prospecting it",
                        region.id, in_progress
                    ));
                }
            }
            Some(Prospection::Completed {
                prize: Some(tier), ..
            }) => *awarded.entry(*tier).or_insert(0) += 1,
            _ => {}
        }
    }

    for prize in &params.prizes {
        let found = state.prizes.found(prize.name);
        if found > prize.number {
            violations.push(format!(
                "{} found {} times, cap is {}",
                prize.name, found, prize.number
            ));
        }
        let listed = awarded.get(&prize.name).copied().unwrap_or(0);
        if listed != found {
            violations.push(format!(
                "{} counter says {found} but {listed} regions hold it",
                prize.name
            ));
        }
    }
    violations
}

fn completed_records(state: &GameState) -> BTreeMap<RegionId, Prospection> {
    state
        .regions
        .iter()
        .filter(|r| r.is_prospected())
        .filter_map(|r| r.prospection.clone().map(|p| (r.id, p)))
        .collect()
}

fn check_scenario_invariants(scenario: &Scenario, params: &EngineParams) -> CheckResult {
    let mut violations = Vec::new();
    let outcome = RegtestNode::new(params.clone()).and_then(|mut node| {
        let mut completed = completed_records(node.state());
        scenario.run_with(&mut node, |step, node| {
            let state = node.state();
            for v in check_invariants(state, params) {
                violations.push(format!("height {}: {v}", state.height));
            }
            let now = completed_records(state);
            // Reorgs may legitimately undo a completion.
            if !step.is_reorg() {
                for (id, record) in &completed {
                    if now.get(id) != Some(record) {
                        violations.push(format!(
                            "height {}: completed region {id} changed",
                            state.height
                        ));
                    }
                }
            }
            completed = now;
            Ok(())
        })
    });

    match outcome {
        Err(err) => CheckResult::new("invariants", &scenario.name, CheckStatus::Fail, err.to_string()),
        Ok(()) if violations.is_empty() => CheckResult::new(
            "invariants",
            &scenario.name,
            CheckStatus::Pass,
            "All invariants held after every step",
        ),
        Ok(()) => CheckResult::new(
            "invariants",
            &scenario.name,
            CheckStatus::Fail,
            violations.join("\n"),
        ),
    }
}

fn run_to_json(scenario: &Scenario, params: &EngineParams) -> Result<serde_json::Value> {
    let mut node = RegtestNode::new(params.clone())?;
    scenario.run(&mut node)?;
    Ok(node.game_state())
}

fn check_replay(scenario: &Scenario, params: &EngineParams) -> CheckResult {
    let runs = run_to_json(scenario, params).and_then(|a| Ok((a, run_to_json(scenario, params)?)));
    match runs {
        Err(err) => CheckResult::new("replay", &scenario.name, CheckStatus::Fail, err.to_string()),
        Ok((a, b)) if a == b => CheckResult::new(
            "replay",
            &scenario.name,
            CheckStatus::Pass,
            "Two runs produced identical state",
        ),
        Ok(_) => CheckResult::new(
            "replay",
            &scenario.name,
            CheckStatus::Fail,
            "Two runs of the same scenario diverged",
        ),
    }
}

fn check_reorg(scenario: &Scenario, params: &EngineParams) -> CheckResult {
    let result = (|| -> Result<CheckResult> {
        let mut node = RegtestNode::new(params.clone())?;
        scenario.run(&mut node)?;
        let Some(first) = node.chain().get_block_hash(1) else {
            return Ok(CheckResult::new(
                "reorg",
                &scenario.name,
                CheckStatus::Skipped,
                "No blocks beyond genesis",
            ));
        };
        let tip = node.get_best_block_hash();
        let before = node.game_state();

        node.invalidate_block(&first)?;
        node.reconsider_block(&first)?;

        if node.get_best_block_hash() != tip {
            return Ok(CheckResult::new(
                "reorg",
                &scenario.name,
                CheckStatus::Warn,
                "Best tip moved to a competing branch of equal height",
            ));
        }
        if node.game_state() == before {
            Ok(CheckResult::new(
                "reorg",
                &scenario.name,
                CheckStatus::Pass,
                "Rollback and replay restored identical state",
            ))
        } else {
            Ok(CheckResult::new(
                "reorg",
                &scenario.name,
                CheckStatus::Fail,
                "State after rollback and replay differs",
            ))
        }
    })();
    result.unwrap_or_else(|err| {
        CheckResult::new("reorg", &scenario.name, CheckStatus::Fail, err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_core::{Faction, HexCoord};

    #[test]
    fn fresh_node_has_no_violations() {
        let node = RegtestNode::new(EngineParams::default()).unwrap();
        assert!(check_invariants(node.state(), &EngineParams::default()).is_empty());
    }

    #[test]
    fn detects_claim_without_prospector() {
        let mut node = RegtestNode::new(EngineParams::default()).unwrap();
        node.spawn("domob", Faction::Red, HexCoord::new(0, 0));
        node.generate(1).unwrap();
        let id = node.character_id("domob").unwrap();

        let mut state = node.state().clone();
        let region = node.engine().region_map().region_id(&HexCoord::new(0, 0));
        state.regions.set_in_progress(region, id).unwrap();
        let violations = check_invariants(&state, &EngineParams::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("not prospecting"));
    }

    #[test]
    fn filters_build_directories() {
        assert!(filter_entry(Path::new("scenarios/basic.toml")));
        assert!(!filter_entry(Path::new("target/debug/x.json")));
        assert!(!filter_entry(Path::new("reports/run.json")));
    }
}
