//! Plain-text rendering for terminal output.

use stagesync_core::{
  classify::{StageBreakdown, StageResult},
  store::StageUpdate,
  view::PersonView,
};

fn verdict_text(result: &StageResult) -> String {
  let stage = result.stage.map_or_else(|| "-".to_owned(), |s| s.to_string());
  let substage = result.substage.map_or_else(|| "-".to_owned(), |s| s.to_string());
  format!("{stage}\t{substage}")
}

/// `<id>\t<stage>\t<substage>`, one line per person.
pub fn verdict_line(person_id: u64, breakdown: &StageBreakdown) -> String {
  format!("{person_id}\t{}", verdict_text(&breakdown.result()))
}

/// Multi-line summary of a person's view and verdict.
pub fn person_detail(view: &PersonView, breakdown: &StageBreakdown) -> String {
  let mut out = format!("person {}\n", view.person_id);
  out.push_str(&format!("  stage:     {}\n", stage_or_dash(breakdown)));
  out.push_str(&format!("             {}\n", breakdown.stage_reason));
  let substage = breakdown
    .substage
    .map_or_else(|| "-".to_owned(), |s| s.to_string());
  out.push_str(&format!("  substage:  {substage}\n"));
  out.push_str(&format!("             {}\n", breakdown.substage_reason));

  let completed: Vec<&str> = view
    .checklist_completion
    .iter()
    .chain(view.item_completion.iter())
    .filter(|(_, done)| **done)
    .map(|(name, _)| name.as_str())
    .collect();
  if !completed.is_empty() {
    out.push_str(&format!("  completed: {}\n", completed.join(", ")));
  }
  for item in &view.item_status {
    out.push_str(&format!("  item:      {} ({:?})\n", item.name, item.status));
  }
  if let Some(d) = &view.school_decision {
    out.push_str(&format!("  school:    {d}\n"));
  }
  if let Some(d) = &view.candidate_decision {
    out.push_str(&format!("  candidate: {d}\n"));
  }
  if view.inactive {
    out.push_str("  inactive\n");
  }
  out
}

fn stage_or_dash(breakdown: &StageBreakdown) -> String {
  breakdown.stage.map_or_else(|| "-".to_owned(), |s| s.to_string())
}

/// `<update id>\t<person>\t<previous> -> <current>`
pub fn update_line(update: &StageUpdate) -> String {
  let previous = update
    .previous
    .as_ref()
    .map_or_else(|| "(none)".to_owned(), verdict_text);
  format!(
    "{}\t{}\t{} -> {}",
    update.update_id,
    update.person_id,
    previous.replace('\t', " / "),
    verdict_text(&update.current).replace('\t', " / "),
  )
}
