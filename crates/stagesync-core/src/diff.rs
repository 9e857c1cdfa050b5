//! Verdict change detection: fresh classification → update to emit, if any.

use serde::{Deserialize, Serialize};

use crate::classify::StageResult;

/// A verdict transition worth sending downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageChange {
  pub previous: Option<StageResult>,
  pub current:  StageResult,
}

impl StageChange {
  pub fn stage_changed(&self) -> bool {
    self.previous.map(|p| p.stage) != Some(self.current.stage)
  }

  pub fn substage_changed(&self) -> bool {
    self.previous.map(|p| p.substage) != Some(self.current.substage)
  }
}

/// Compare `current` against the last persisted verdict.
///
/// Returns `None` when nothing changed. A person seen for the first time
/// with an undetermined verdict is not a change either: there is nothing to
/// tell the CRM yet.
pub fn diff_verdict(
  previous: Option<&StageResult>,
  current: &StageResult,
) -> Option<StageChange> {
  match previous {
    Some(prev) if prev == current => None,
    None if current.is_undetermined() => None,
    _ => Some(StageChange { previous: previous.copied(), current: *current }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classify::{Stage, Substage};

  fn verdict(stage: Option<Stage>, substage: Option<Substage>) -> StageResult {
    StageResult { stage, substage }
  }

  #[test]
  fn unchanged_verdict_is_no_change() {
    let v = verdict(Some(Stage::Application), Some(Substage::ApplicationComplete));
    assert_eq!(diff_verdict(Some(&v), &v), None);
  }

  #[test]
  fn first_undetermined_verdict_is_no_change() {
    assert_eq!(diff_verdict(None, &StageResult::default()), None);
  }

  #[test]
  fn first_determined_verdict_is_a_change() {
    let v = verdict(None, Some(Substage::AssessmentScheduled));
    let change = diff_verdict(None, &v).unwrap();
    assert_eq!(change.previous, None);
    assert_eq!(change.current, v);
    assert!(change.substage_changed());
    assert!(change.stage_changed());
  }

  #[test]
  fn substage_only_change() {
    let before = verdict(Some(Stage::Decision), Some(Substage::Waitlisted));
    let after = verdict(Some(Stage::Decision), Some(Substage::Accepted));
    let change = diff_verdict(Some(&before), &after).unwrap();
    assert!(!change.stage_changed());
    assert!(change.substage_changed());
  }

  #[test]
  fn regression_to_undetermined_is_a_change() {
    let before = verdict(Some(Stage::Application), Some(Substage::ApplicationComplete));
    let change = diff_verdict(Some(&before), &StageResult::default()).unwrap();
    assert_eq!(change.previous, Some(before));
    assert!(change.current.is_undetermined());
  }
}
