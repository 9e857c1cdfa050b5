//! Stage and substage inference over a [`PersonView`].
//!
//! Both classifiers are ordered guard lists: the first matching guard wins
//! and later guards are never consulted. Classification is a pure
//! re-derivation from the current snapshot; no previous verdict is involved.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  Error,
  aggregate::aggregate,
  fact::RawChecklistFact,
  view::{ItemState, PersonView},
};

/// Labels and decision codes the classifier matches against. Matching is
/// exact and case-sensitive.
pub mod labels {
  pub const APPLICATION_FORM: &str = "Application Form";
  pub const DECISION: &str = "Decision";
  pub const ENROLLMENT_CONTRACT_RECEIVED: &str = "Enrollment Contract Received";

  pub const ASSESSMENT_ITEM: &str = "Fairmont Admissions Assessment";
  pub const REASSESSMENT_ITEM: &str = "Fairmont Admissions Re-Assessment";
  pub const ASSESSMENT_TEST: &str = "Assessment";
  pub const REASSESSMENT_TEST: &str = "Re-Assessment";

  pub const CANDIDATE_DECLINED: &str = "I Decline";
  pub const SCHOOL_DENIED: &str = "Denied";
  pub const WAITLIST_DEPOSIT_PAID: &str = "Waitlist w/ Deposit Paid";
  pub const ACCEPTED_WITH_CONDITIONS: &str = "Accepted w/ Conditions";
  pub const ACCEPTED: &str = "Accepted";
  pub const WAITLIST: &str = "Waitlist";
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// Pipeline stage. The serialised and displayed spellings are the literal
/// values the CRM expects; the unspaced forms are accepted on input.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
pub enum Stage {
  Application,
  Decision,
  #[serde(rename = "Contract Sent", alias = "ContractSent")]
  #[strum(to_string = "Contract Sent", serialize = "ContractSent")]
  ContractSent,
  #[serde(rename = "Closed Won", alias = "ClosedWon")]
  #[strum(to_string = "Closed Won", serialize = "ClosedWon")]
  ClosedWon,
  #[serde(rename = "Closed Lost", alias = "ClosedLost")]
  #[strum(to_string = "Closed Lost", serialize = "ClosedLost")]
  ClosedLost,
}

// ─── Substage ────────────────────────────────────────────────────────────────

/// Fine-grained position within the pipeline, serialised as its integer code
/// (13–28).
///
/// [`Substage::ApplicationSent`] is only ever set manually downstream and
/// [`Substage::DocumentsMissing`] has no derivation rule; neither is
/// returned by [`classify_substage`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Substage {
  ApplicationSent = 13,
  ApplicationComplete = 14,
  AssessmentScheduled = 15,
  AssessmentNoShow = 16,
  AssessmentComplete = 17,
  ReassessmentScheduled = 18,
  ReassessmentNoShow = 19,
  ReassessmentComplete = 20,
  Waitlisted = 21,
  DocumentsMissing = 22,
  Accepted = 23,
  AcceptedWithConditions = 24,
  ContractReturnedDepositPending = 25,
  WaitlistDepositPaid = 26,
  Enrolled = 27,
  Recyclable = 28,
}

impl Substage {
  pub const fn code(self) -> u8 { self as u8 }

  /// Human-readable label for the substage code.
  pub const fn label(self) -> &'static str {
    match self {
      Self::ApplicationSent => "Application sent",
      Self::ApplicationComplete => "Application complete",
      Self::AssessmentScheduled => "Assessment scheduled",
      Self::AssessmentNoShow => "Assessment no-show",
      Self::AssessmentComplete => "Assessment complete",
      Self::ReassessmentScheduled => "Re-assessment scheduled",
      Self::ReassessmentNoShow => "Re-assessment no-show",
      Self::ReassessmentComplete => "Re-assessment complete",
      Self::Waitlisted => "Waitlisted",
      Self::DocumentsMissing => "Documents missing",
      Self::Accepted => "Accepted",
      Self::AcceptedWithConditions => "Accepted with conditions",
      Self::ContractReturnedDepositPending => "Contract returned, deposit pending",
      Self::WaitlistDepositPaid => "Waitlist with deposit paid",
      Self::Enrolled => "Enrolled",
      Self::Recyclable => "Recyclable",
    }
  }

  /// Fixed justification for the rule that yields this substage.
  const fn reason(self) -> &'static str {
    match self {
      Self::Recyclable => "Inactive, candidate declined, or school denied",
      Self::Enrolled => "Enrollment contract received",
      Self::WaitlistDepositPaid => "School decision is Waitlist w/ Deposit Paid",
      Self::ContractReturnedDepositPending => {
        "Contract returned but deposit not yet received"
      }
      Self::AcceptedWithConditions => "School decision is Accepted w/ Conditions",
      Self::Accepted => "School decision is Accepted",
      Self::Waitlisted => "School decision is Waitlist",
      Self::ReassessmentComplete => "Re-assessment item complete",
      Self::ReassessmentNoShow => "No-show recorded for the re-assessment",
      Self::ReassessmentScheduled => "Re-assessment item requested",
      Self::AssessmentComplete => "Assessment item complete",
      Self::AssessmentNoShow => "No-show recorded for the assessment",
      Self::AssessmentScheduled => "Assessment item requested",
      Self::ApplicationComplete => "Application form complete",
      Self::ApplicationSent => "Application sent (set manually)",
      Self::DocumentsMissing => "Documents missing (no derivation rule)",
    }
  }
}

impl From<Substage> for u8 {
  fn from(s: Substage) -> u8 { s.code() }
}

impl TryFrom<u8> for Substage {
  type Error = Error;

  fn try_from(code: u8) -> Result<Self, Error> {
    use strum::IntoEnumIterator as _;
    Self::iter()
      .find(|s| s.code() == code)
      .ok_or(Error::InvalidSubstage(code.into()))
  }
}

impl std::fmt::Display for Substage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.code(), self.label())
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// The classifier's verdict. Either half may be undetermined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageResult {
  pub stage:    Option<Stage>,
  pub substage: Option<Substage>,
}

impl StageResult {
  pub fn is_undetermined(&self) -> bool {
    self.stage.is_none() && self.substage.is_none()
  }
}

/// A [`StageResult`] with justification strings for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBreakdown {
  pub stage:           Option<Stage>,
  pub substage:        Option<Substage>,
  pub substage_label:  Option<String>,
  pub stage_reason:    String,
  pub substage_reason: String,
}

impl StageBreakdown {
  pub fn result(&self) -> StageResult {
    StageResult { stage: self.stage, substage: self.substage }
  }
}

// ─── Stage rules ─────────────────────────────────────────────────────────────

/// The stage guard that fired, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageRule {
  Inactive,
  DeclinedOrDenied,
  EnrollmentContractReceived,
  ContractPublished,
  DecisionComplete,
  ApplicationComplete,
}

impl StageRule {
  const fn stage(self) -> Stage {
    match self {
      Self::Inactive | Self::DeclinedOrDenied => Stage::ClosedLost,
      Self::EnrollmentContractReceived => Stage::ClosedWon,
      Self::ContractPublished => Stage::ContractSent,
      Self::DecisionComplete => Stage::Decision,
      Self::ApplicationComplete => Stage::Application,
    }
  }

  const fn reason(self) -> &'static str {
    match self {
      Self::Inactive => "Record is marked inactive",
      Self::DeclinedOrDenied => "Candidate declined or school denied",
      Self::EnrollmentContractReceived => "Enrollment contract received",
      Self::ContractPublished => "Contract has been published",
      Self::DecisionComplete => "Decision checklist complete",
      Self::ApplicationComplete => "Application form complete",
    }
  }
}

const NO_STAGE_REASON: &str = "No stage criteria met";
const NO_SUBSTAGE_REASON: &str = "No substage criteria met";

fn declined_or_denied(view: &PersonView) -> bool {
  view.candidate_decision.as_deref() == Some(labels::CANDIDATE_DECLINED)
    || view.school_decision.as_deref() == Some(labels::SCHOOL_DENIED)
}

fn school_decision_is(view: &PersonView, code: &str) -> bool {
  view.school_decision.as_deref() == Some(code)
}

fn stage_rule(view: &PersonView) -> Option<StageRule> {
  if view.inactive {
    Some(StageRule::Inactive)
  } else if declined_or_denied(view) {
    Some(StageRule::DeclinedOrDenied)
  } else if view.is_completed(labels::ENROLLMENT_CONTRACT_RECEIVED) {
    Some(StageRule::EnrollmentContractReceived)
  } else if view.contract_publish_date.is_some() {
    Some(StageRule::ContractPublished)
  } else if view.is_completed(labels::DECISION) {
    Some(StageRule::DecisionComplete)
  } else if view.is_completed(labels::APPLICATION_FORM) {
    Some(StageRule::ApplicationComplete)
  } else {
    None
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Classify the pipeline stage; `None` when nothing determinable yet.
pub fn classify_stage(view: &PersonView) -> Option<Stage> {
  stage_rule(view).map(StageRule::stage)
}

/// Classify the substage, checking the most advanced states first so a
/// person who has progressed further is never reported as earlier.
pub fn classify_substage(view: &PersonView) -> Option<Substage> {
  use Substage::*;

  let contract_received = view.is_completed(labels::ENROLLMENT_CONTRACT_RECEIVED);

  let substage = if view.inactive || declined_or_denied(view) {
    Recyclable
  } else if contract_received {
    Enrolled
  } else if school_decision_is(view, labels::WAITLIST_DEPOSIT_PAID) {
    WaitlistDepositPaid
  } else if !contract_received
    && view.contract_return_date.is_some()
    && view.contract_dep_rec_date.is_none()
  {
    ContractReturnedDepositPending
  } else if school_decision_is(view, labels::ACCEPTED_WITH_CONDITIONS) {
    AcceptedWithConditions
  } else if school_decision_is(view, labels::ACCEPTED) {
    Accepted
  } else if school_decision_is(view, labels::WAITLIST) {
    Waitlisted
  } else if view.item_state(labels::REASSESSMENT_ITEM) == Some(ItemState::Complete) {
    ReassessmentComplete
  } else if view.no_show_for(labels::REASSESSMENT_TEST) {
    ReassessmentNoShow
  } else if view.item_state(labels::REASSESSMENT_ITEM) == Some(ItemState::Requested) {
    ReassessmentScheduled
  } else if view.item_state(labels::ASSESSMENT_ITEM) == Some(ItemState::Complete) {
    AssessmentComplete
  } else if view.no_show_for(labels::ASSESSMENT_TEST)
    && !view.no_show_for(labels::REASSESSMENT_TEST)
  {
    AssessmentNoShow
  } else if view.item_state(labels::ASSESSMENT_ITEM) == Some(ItemState::Requested) {
    AssessmentScheduled
  } else if view.is_completed(labels::APPLICATION_FORM) {
    ApplicationComplete
  } else {
    return None;
  };

  Some(substage)
}

/// Stage and substage together.
pub fn classify(view: &PersonView) -> StageResult {
  StageResult {
    stage:    classify_stage(view),
    substage: classify_substage(view),
  }
}

/// [`classify`] plus the label and justification for each half.
pub fn classify_with_breakdown(view: &PersonView) -> StageBreakdown {
  let rule = stage_rule(view);
  let substage = classify_substage(view);

  StageBreakdown {
    stage:           rule.map(StageRule::stage),
    substage,
    substage_label:  substage.map(|s| s.label().to_owned()),
    stage_reason:    rule.map_or(NO_STAGE_REASON, StageRule::reason).to_owned(),
    substage_reason: substage.map_or(NO_SUBSTAGE_REASON, Substage::reason).to_owned(),
  }
}

/// One person's aggregated view and verdict from a batch of facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPerson {
  pub person_id: u64,
  pub view:      PersonView,
  pub breakdown: StageBreakdown,
}

/// Aggregate a batch of facts and classify every person in it, ordered by
/// person id. Nothing is persisted.
pub fn classify_facts<I>(facts: I) -> Vec<ClassifiedPerson>
where
  I: IntoIterator<Item = RawChecklistFact>,
{
  aggregate(facts)
    .into_iter()
    .map(|(person_id, view)| {
      let breakdown = classify_with_breakdown(&view);
      ClassifiedPerson { person_id, view, breakdown }
    })
    .collect()
}
