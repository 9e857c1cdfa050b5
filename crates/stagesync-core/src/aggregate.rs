//! Folding raw facts into one [`PersonView`] per person.
//!
//! Each view field has exactly one reduction strategy:
//!
//! | Reducer | Fields |
//! |---------|--------|
//! | [`LastNonNull`] | decisions, contract dates, `test_short_description`, `reason_declined` |
//! | [`OrSticky`] | `inactive`, `test_no_show` |
//! | [`UnionMap`] | `checklist_completion`, `item_completion` |
//! | [`UpgradeOnly`] | `item_status` |
//!
//! Only the `LastNonNull` fields depend on input order; all others are
//! invariant under any permutation of the facts.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::{
  fact::RawChecklistFact,
  normalize::non_blank,
  view::{ItemState, ItemStatus, PersonView},
};

// ─── Reducers ────────────────────────────────────────────────────────────────

/// A field-level fold step.
pub trait Reducer {
  type Input;
  type Output;

  fn fold(&mut self, input: Self::Input);
  fn finish(self) -> Self::Output;
}

/// Later non-null values overwrite earlier ones; a later null never erases.
#[derive(Debug, Clone)]
pub struct LastNonNull<T>(Option<T>);

impl<T> Default for LastNonNull<T> {
  fn default() -> Self { Self(None) }
}

impl<T> Reducer for LastNonNull<T> {
  type Input = Option<T>;
  type Output = Option<T>;

  fn fold(&mut self, input: Option<T>) {
    if input.is_some() {
      self.0 = input;
    }
  }

  fn finish(self) -> Option<T> { self.0 }
}

/// Logical OR; once true, stays true.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrSticky(bool);

impl Reducer for OrSticky {
  type Input = bool;
  type Output = bool;

  fn fold(&mut self, input: bool) { self.0 |= input; }

  fn finish(self) -> bool { self.0 }
}

/// Label → "seen completed at least once". A label observed only as
/// incomplete maps to `false`.
#[derive(Debug, Clone, Default)]
pub struct UnionMap(BTreeMap<String, bool>);

impl Reducer for UnionMap {
  type Input = (String, bool);
  type Output = BTreeMap<String, bool>;

  fn fold(&mut self, (label, complete): (String, bool)) {
    *self.0.entry(label).or_insert(false) |= complete;
  }

  fn finish(self) -> BTreeMap<String, bool> { self.0 }
}

/// Ordered item statuses that only ever move from `Requested` to
/// `Complete`. Entries keep their first-seen position.
#[derive(Debug, Clone, Default)]
pub struct UpgradeOnly {
  items: Vec<ItemStatus>,
  index: HashMap<String, usize>,
}

impl Reducer for UpgradeOnly {
  type Input = (String, ItemState);
  type Output = Vec<ItemStatus>;

  fn fold(&mut self, (name, status): (String, ItemState)) {
    match self.index.get(&name) {
      Some(&i) => {
        let slot = &mut self.items[i].status;
        *slot = (*slot).max(status);
      }
      None => {
        self.index.insert(name.clone(), self.items.len());
        self.items.push(ItemStatus { name, status });
      }
    }
  }

  fn finish(self) -> Vec<ItemStatus> { self.items }
}

// ─── Per-person accumulator ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PersonAccumulator {
  checklist_completion:   UnionMap,
  item_completion:        UnionMap,
  item_status:            UpgradeOnly,
  test_no_show:           OrSticky,
  test_short_description: LastNonNull<String>,
  candidate_decision:     LastNonNull<String>,
  school_decision:        LastNonNull<String>,
  reason_declined:        LastNonNull<String>,
  inactive:               OrSticky,
  contract_publish_date:  LastNonNull<NaiveDate>,
  contract_return_date:   LastNonNull<NaiveDate>,
  contract_dep_rec_date:  LastNonNull<NaiveDate>,
}

impl PersonAccumulator {
  fn fold(&mut self, fact: RawChecklistFact) {
    let complete = fact.is_complete();

    // A blank name would match every label in the fuzzy item lookup.
    if let Some(name) = non_blank(fact.checklist_name) {
      self.checklist_completion.fold((name, complete));
    }
    if let Some(name) = non_blank(fact.item_name) {
      self.item_completion.fold((name.clone(), complete));
      if complete {
        self.item_status.fold((name, ItemState::Complete));
      } else if fact.requested_on.is_some() {
        self.item_status.fold((name, ItemState::Requested));
      }
    }

    self.test_no_show.fold(fact.test_no_show);
    self.test_short_description.fold(fact.test_short_description);
    self.candidate_decision.fold(fact.candidate_decision);
    self.school_decision.fold(fact.school_decision);
    self.reason_declined.fold(fact.reason_declined);
    self.inactive.fold(fact.inactive);
    self.contract_publish_date.fold(fact.contract_publish_date);
    self.contract_return_date.fold(fact.contract_return_date);
    self.contract_dep_rec_date.fold(fact.contract_dep_rec_date);
  }

  fn finish(self, person_id: u64) -> PersonView {
    PersonView {
      person_id,
      checklist_completion: self.checklist_completion.finish(),
      item_completion: self.item_completion.finish(),
      item_status: self.item_status.finish(),
      test_no_show: self.test_no_show.finish(),
      test_short_description: self.test_short_description.finish(),
      candidate_decision: self.candidate_decision.finish(),
      school_decision: self.school_decision.finish(),
      reason_declined: self.reason_declined.finish(),
      inactive: self.inactive.finish(),
      contract_publish_date: self.contract_publish_date.finish(),
      contract_return_date: self.contract_return_date.finish(),
      contract_dep_rec_date: self.contract_dep_rec_date.finish(),
    }
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Fold `facts`, in the order given, into one view per distinct `person_id`.
///
/// Facts without a `person_id` are skipped. Callers that need deterministic
/// "last non-null" results must supply facts in a deterministic order.
pub fn aggregate<I>(facts: I) -> BTreeMap<u64, PersonView>
where
  I: IntoIterator<Item = RawChecklistFact>,
{
  let mut people: BTreeMap<u64, PersonAccumulator> = BTreeMap::new();
  let mut skipped = 0usize;

  for fact in facts {
    let Some(person_id) = fact.person_id else {
      skipped += 1;
      continue;
    };
    people.entry(person_id).or_default().fold(fact);
  }

  if skipped > 0 {
    tracing::trace!(skipped, "dropped facts without a person id");
  }

  people
    .into_iter()
    .map(|(id, acc)| (id, acc.finish(id)))
    .collect()
}

/// Fold facts for a single, known person. Facts attributed to a different
/// person (or to nobody) are ignored.
pub fn aggregate_person<I>(person_id: u64, facts: I) -> PersonView
where
  I: IntoIterator<Item = RawChecklistFact>,
{
  let mut acc = PersonAccumulator::default();
  for fact in facts {
    if fact.person_id == Some(person_id) {
      acc.fold(fact);
    }
  }
  acc.finish(person_id)
}
