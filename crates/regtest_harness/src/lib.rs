//! Regtest stand-ins for the chain and node around the prospecting engine,
//! plus scripted scenarios and the checks run over them.

pub mod chain;
pub mod checks;
pub mod config;
pub mod error;
pub mod node;
pub mod report;
pub mod scenario;

pub use chain::Chain;
pub use checks::{check_invariants, discover_scenarios, run_checks, CheckOptions};
pub use config::{CheckToggles, HarnessConfig};
pub use error::{ChainError, HarnessError};
pub use node::RegtestNode;
pub use report::{CheckResult, CheckStatus, ReportStatus, ReportSummary, ScenarioReport, SourceInfo};
pub use scenario::{Scenario, Step};
