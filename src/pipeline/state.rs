//! Run state: the page ledger, the invoice registry, and the text cache.
//!
//! The ledger is what makes the accounting invariant checkable instead of
//! assumed. Every page holds exactly one assignment state; moving a page into
//! a document is allowed from `Unvisited` or `Pending` only, and a second
//! assignment attempt is recorded as a violation rather than silently
//! overwriting — so double-ownership bugs surface in the run summary instead
//! of corrupting output.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::error;

/// Identifier of an emitted document: its index in the run's record list.
pub type DocumentId = usize;

/// Where a page stands in the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Not yet placed anywhere.
    Unvisited,
    /// Queued for the reconciliation pass.
    Pending,
    /// Owned by an emitted document.
    Assigned(DocumentId),
}

/// A recorded attempt to give a page a second owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipViolation {
    pub page: usize,
    pub owner: DocumentId,
    pub claimant: DocumentId,
}

/// Final page partition, produced by [`PageLedger::accounting`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounting {
    /// Blank pages not claimed by any document.
    pub blank_unassigned: usize,
    /// Pages owned by documents (blanks swallowed into spans included).
    pub assigned: usize,
    /// Pages still pending — zero after finalization unless something leaked.
    pub pending: usize,
    /// Non-blank pages nothing ever touched — always a bug.
    pub unvisited_non_blank: usize,
    pub violations: Vec<OwnershipViolation>,
}

/// Per-page blank flags and assignment states for one run.
#[derive(Debug)]
pub struct PageLedger {
    blank: Vec<bool>,
    assignment: Vec<Assignment>,
    pending: BTreeSet<usize>,
    violations: Vec<OwnershipViolation>,
}

impl PageLedger {
    pub fn new(total_pages: usize) -> Self {
        Self {
            blank: vec![false; total_pages],
            assignment: vec![Assignment::Unvisited; total_pages],
            pending: BTreeSet::new(),
            violations: Vec::new(),
        }
    }

    pub fn total_pages(&self) -> usize {
        self.blank.len()
    }

    /// Flag a page blank. Called only by the filter stage, before any
    /// classification; the flag is never cleared afterwards.
    pub fn mark_blank(&mut self, page: usize) {
        self.blank[page] = true;
    }

    pub fn is_blank(&self, page: usize) -> bool {
        self.blank[page]
    }

    /// Non-blank page indices in ascending order — the classification
    /// stream.
    pub fn non_blank_pages(&self) -> Vec<usize> {
        (0..self.blank.len()).filter(|&i| !self.blank[i]).collect()
    }

    /// Blank pages as counted by the filter stage (before any span swallows
    /// one).
    pub fn blank_total(&self) -> usize {
        self.blank.iter().filter(|&&b| b).count()
    }

    /// Queue a page for reconciliation. Already-assigned pages stay where
    /// they are.
    pub fn mark_pending(&mut self, page: usize) {
        if matches!(self.assignment[page], Assignment::Assigned(_)) {
            return;
        }
        self.assignment[page] = Assignment::Pending;
        self.pending.insert(page);
    }

    pub fn is_pending(&self, page: usize) -> bool {
        matches!(self.assignment[page], Assignment::Pending)
    }

    pub fn is_assigned(&self, page: usize) -> bool {
        matches!(self.assignment[page], Assignment::Assigned(_))
    }

    /// Immutable snapshot of the pending set, ascending. Reconciliation
    /// iterates this while removals hit the live set.
    pub fn pending_snapshot(&self) -> Vec<usize> {
        self.pending.iter().copied().collect()
    }

    /// Assign every page in `first..=last` to `doc`. An already-assigned
    /// page keeps its owner and the attempt is recorded as a violation.
    pub fn assign_span(&mut self, first: usize, last: usize, doc: DocumentId) {
        for page in first..=last {
            match self.assignment[page] {
                Assignment::Assigned(owner) => {
                    error!(page, owner, claimant = doc, "page already owned by another document");
                    self.violations.push(OwnershipViolation {
                        page,
                        owner,
                        claimant: doc,
                    });
                }
                Assignment::Unvisited | Assignment::Pending => {
                    self.assignment[page] = Assignment::Assigned(doc);
                    self.pending.remove(&page);
                }
            }
        }
    }

    /// Compute the final partition for the accounting check.
    pub fn accounting(&self) -> Accounting {
        let mut acct = Accounting {
            blank_unassigned: 0,
            assigned: 0,
            pending: 0,
            unvisited_non_blank: 0,
            violations: self.violations.clone(),
        };
        for page in 0..self.blank.len() {
            match self.assignment[page] {
                Assignment::Assigned(_) => acct.assigned += 1,
                Assignment::Pending => acct.pending += 1,
                Assignment::Unvisited => {
                    if self.blank[page] {
                        acct.blank_unassigned += 1;
                    } else {
                        acct.unvisited_non_blank += 1;
                    }
                }
            }
        }
        acct
    }
}

/// Invoice number → parsed date, filled as invoices are classified.
///
/// Waybills quote the invoice they accompany; the registry is how their
/// output names inherit that invoice's date. Duplicate numbers are
/// last-write-wins — the stream is processed in order and a re-issued
/// invoice supersedes the earlier sheet.
#[derive(Debug, Default)]
pub struct InvoiceRegistry {
    dates: HashMap<String, NaiveDate>,
}

impl InvoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, number: impl Into<String>, date: NaiveDate) {
        self.dates.insert(number.into(), date);
    }

    pub fn get(&self, number: &str) -> Option<NaiveDate> {
        self.dates.get(number).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Lazily-filled page text, so backward scans and re-visits never re-extract.
///
/// Extraction failures are cached as empty strings: the recovery decision
/// ("treat as no signals") is made once and stays consistent across passes.
#[derive(Debug)]
pub struct TextCache {
    pages: Vec<Option<String>>,
}

impl TextCache {
    pub fn new(total_pages: usize) -> Self {
        Self {
            pages: vec![None; total_pages],
        }
    }

    /// Get the cached text for `page`, or fill it via `extract`.
    pub fn get_or_extract(&mut self, page: usize, extract: impl FnOnce() -> String) -> &str {
        if self.pages[page].is_none() {
            self.pages[page] = Some(extract());
        }
        self.pages[page].as_deref().unwrap_or_default()
    }
}
