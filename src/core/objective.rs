//! Objective contract for behavior-tree documents.
//!
//! A document that declares a `BehaviorTree` must also describe itself as an
//! objective: a `TreeNodesModel` whose `SubTree` carries `MetadataFields` with
//! at least one `Metadata` giving a `subcategory` and one giving a
//! `description`. Documents without a `BehaviorTree` are out of scope.
//!
//! Rules run in the fixed order of [`OBJECTIVE_RULES`] and only the first
//! violated rule is reported. The order is part of the contract: it decides
//! which message a file with several problems gets.

use crate::core::document::{Document, Element, ParseFailure};
use crate::core::error::LintError;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const BEHAVIOR_TREE: &str = "BehaviorTree";
pub const TREE_NODES_MODEL: &str = "TreeNodesModel";
pub const SUBTREE: &str = "SubTree";
pub const METADATA_FIELDS: &str = "MetadataFields";
pub const METADATA: &str = "Metadata";
pub const SUBTREE_ONLY_ATTR: &str = "_subtreeOnly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    TreeNodesModelMissing,
    SubtreeOnlyDeprecated,
    SubTreeMissing,
    MetadataFieldsMissing,
    SubcategoryMissing,
    DescriptionMissing,
}

impl Violation {
    pub fn reason(self) -> &'static str {
        match self {
            Violation::TreeNodesModelMissing => "TreeNodesModel not found",
            Violation::SubtreeOnlyDeprecated => {
                "_subtreeOnly attribute is deprecated, please use `runnable` Metadata instead"
            }
            Violation::SubTreeMissing => "SubTree definition not found",
            Violation::MetadataFieldsMissing => "MetadataFields not found",
            Violation::SubcategoryMissing => "Objective subcategory not found",
            Violation::DescriptionMissing => "Objective description not found",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// The elements the rules look at, resolved once per document.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveView<'a> {
    pub behavior_tree: &'a Element,
    pub tree_nodes_model: Option<&'a Element>,
    pub subtree: Option<&'a Element>,
    pub metadata_fields: Option<&'a Element>,
}

impl<'a> ObjectiveView<'a> {
    /// `None` when no element below the root is a `BehaviorTree`.
    ///
    /// `BehaviorTree` and `TreeNodesModel` are searched below the root element,
    /// never the root itself. `SubTree` and `MetadataFields` are taken from the
    /// direct children first, falling back to deeper descendants.
    pub fn resolve(doc: &'a Document) -> Option<Self> {
        let root = doc.root();
        let behavior_tree = root.find_descendant(BEHAVIOR_TREE)?;
        let tree_nodes_model = root.find_descendant(TREE_NODES_MODEL);
        let subtree = tree_nodes_model.and_then(|m| child_or_descendant(m, SUBTREE));
        let metadata_fields = subtree.and_then(|s| child_or_descendant(s, METADATA_FIELDS));
        Some(Self {
            behavior_tree,
            tree_nodes_model,
            subtree,
            metadata_fields,
        })
    }

    fn metadata_with(&self, attr: &str) -> bool {
        self.metadata_fields
            .is_some_and(|fields| fields.find_with_attribute(METADATA, attr).is_some())
    }
}

fn child_or_descendant<'a>(parent: &'a Element, tag: &str) -> Option<&'a Element> {
    parent
        .find_child(tag)
        .or_else(|| parent.find_descendant(tag))
}

pub type Rule = fn(&ObjectiveView<'_>) -> bool;

pub const OBJECTIVE_RULES: [(Violation, Rule); 6] = [
    (Violation::TreeNodesModelMissing, has_tree_nodes_model),
    (Violation::SubtreeOnlyDeprecated, lacks_subtree_only),
    (Violation::SubTreeMissing, has_subtree),
    (Violation::MetadataFieldsMissing, has_metadata_fields),
    (Violation::SubcategoryMissing, has_subcategory),
    (Violation::DescriptionMissing, has_description),
];

fn has_tree_nodes_model(v: &ObjectiveView<'_>) -> bool {
    v.tree_nodes_model.is_some()
}

// Presence alone is the violation, whatever the value.
fn lacks_subtree_only(v: &ObjectiveView<'_>) -> bool {
    !v.behavior_tree.has_attribute(SUBTREE_ONLY_ATTR)
}

fn has_subtree(v: &ObjectiveView<'_>) -> bool {
    v.subtree.is_some()
}

fn has_metadata_fields(v: &ObjectiveView<'_>) -> bool {
    v.metadata_fields.is_some()
}

fn has_subcategory(v: &ObjectiveView<'_>) -> bool {
    v.metadata_with("subcategory")
}

fn has_description(v: &ObjectiveView<'_>) -> bool {
    v.metadata_with("description")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No `BehaviorTree` element; nothing to check.
    NotObjective,
    Valid,
    Invalid(Violation),
}

pub fn check_document(doc: &Document) -> Verdict {
    let Some(view) = ObjectiveView::resolve(doc) else {
        return Verdict::NotObjective;
    };
    OBJECTIVE_RULES
        .iter()
        .find(|(_, holds)| !holds(&view))
        .map_or(Verdict::Valid, |(violation, _)| Verdict::Invalid(*violation))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    Parse(ParseFailure),
    Contract(Violation),
}

impl FileError {
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::Parse(_) => "parse",
            FileError::Contract(_) => "contract",
        }
    }

    /// `Error validating <path>: <reason>`
    pub fn line(&self, path: &Path) -> String {
        format!("Error validating {}: {}", path.display(), self)
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::Parse(failure) => failure.fmt(f),
            FileError::Contract(violation) => violation.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Passed,
    Failed(FileError),
}

impl Outcome {
    pub fn error(&self) -> Option<&FileError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

pub fn validate_bytes(content: &[u8]) -> Outcome {
    match Document::parse_bytes(content) {
        Ok(doc) => match check_document(&doc) {
            Verdict::NotObjective => Outcome::Skipped,
            Verdict::Valid => Outcome::Passed,
            Verdict::Invalid(v) => Outcome::Failed(FileError::Contract(v)),
        },
        Err(failure) => Outcome::Failed(FileError::Parse(failure)),
    }
}

pub fn validate_source(source: &str) -> Outcome {
    validate_bytes(source.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl FileReport {
    pub fn error_line(&self) -> Option<String> {
        self.outcome.error().map(|e| e.line(&self.path))
    }
}

/// Read and validate one file. `display_path` is what error lines name;
/// read failures propagate.
pub fn validate_file(path: &Path, display_path: &Path) -> Result<FileReport, LintError> {
    let content = fs::read(path).map_err(|source| LintError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileReport {
        path: display_path.to_path_buf(),
        outcome: validate_bytes(&content),
    })
}

/// One file in, an optional `Error validating ...` line out.
pub fn validate_objective(path: &Path) -> Result<Option<String>, LintError> {
    Ok(validate_file(path, path)?.error_line())
}
