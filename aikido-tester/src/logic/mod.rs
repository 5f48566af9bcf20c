pub mod game_tester;
pub mod invariants;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use game_tester::{GameTester, PracticeStyle, SimulationPlan, SimulationSummary, TesterAssets};
pub use seeds::resolve_seed_inputs;
pub use tester::*;
