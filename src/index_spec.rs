//! Label → search index bindings
//!
//! Parses `index:Label(prop,prop);index:Label` specs into an
//! [`IndexSpecTable`] that the action builder consults for every mutated node.

use bitflags::bitflags;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Result, SearchSyncError};

/// Document type used for catch-all index operations
pub const CATCH_ALL_TYPE: &str = "node";

const SPEC_SEPARATOR: char = ';';
const NAME_SEPARATOR: char = ':';
const RESERVED_CHARS: [char; 5] = [':', ';', '(', ')', ','];

bitflags! {
  /// Optional top-level fields embedded in every document
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct DocumentFields: u8 {
    const ID = 0b0000_0001;
    const LABELS = 0b0000_0010;
  }
}

/// Binding of one label to one target index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
  index_name: String,
  label: String,
  properties: IndexSet<String>,
}

impl IndexSpec {
  pub fn new<I, S>(index_name: impl Into<String>, label: impl Into<String>, properties: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      index_name: index_name.into(),
      label: label.into(),
      properties: properties.into_iter().map(Into::into).collect(),
    }
  }

  pub fn index_name(&self) -> &str {
    &self.index_name
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  /// Declared property subset; empty means every property
  pub fn properties(&self) -> &IndexSet<String> {
    &self.properties
  }

  pub fn indexes_all_properties(&self) -> bool {
    self.properties.is_empty()
  }
}

impl fmt::Display for IndexSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.index_name, self.label)?;
    if !self.properties.is_empty() {
      let props: Vec<&str> = self.properties.iter().map(String::as_str).collect();
      write!(f, "({})", props.join(","))?;
    }
    Ok(())
  }
}

impl FromStr for IndexSpec {
  type Err = SearchSyncError;

  fn from_str(raw: &str) -> Result<Self> {
    parse_segment(raw.trim())
  }
}

/// Parse a full spec string into label-keyed bindings.
///
/// Labels keep first-declaration order and so do the bindings per label.
pub fn parse_index_spec(raw: &str) -> Result<IndexMap<String, Vec<IndexSpec>>> {
  let mut by_label: IndexMap<String, Vec<IndexSpec>> = IndexMap::new();

  for segment in raw.split(SPEC_SEPARATOR) {
    let segment = segment.trim();
    if segment.is_empty() {
      continue;
    }

    let spec = parse_segment(segment)?;
    let bindings = by_label.entry(spec.label.clone()).or_default();
    if bindings
      .iter()
      .any(|existing| existing.index_name == spec.index_name)
    {
      return Err(SearchSyncError::DuplicateIndexSpec {
        index: spec.index_name,
        label: spec.label,
      });
    }
    bindings.push(spec);
  }

  if by_label.is_empty() {
    return Err(SearchSyncError::InvalidIndexSpec(format!(
      "no index declarations in: {raw:?}"
    )));
  }

  Ok(by_label)
}

fn parse_segment(segment: &str) -> Result<IndexSpec> {
  let (index_name, rest) = segment.split_once(NAME_SEPARATOR).ok_or_else(|| {
    SearchSyncError::InvalidIndexSpec(format!("expected index:Label, got {segment:?}"))
  })?;

  let (label, properties) = match rest.split_once('(') {
    Some((label, tail)) => {
      let inner = tail.strip_suffix(')').ok_or_else(|| {
        SearchSyncError::InvalidIndexSpec(format!("unclosed property list in {segment:?}"))
      })?;
      (label, parse_properties(inner, segment)?)
    }
    None => (rest, IndexSet::new()),
  };

  let index_name = validate_name(index_name, "index", segment)?;
  let label = validate_name(label, "label", segment)?;

  Ok(IndexSpec {
    index_name,
    label,
    properties,
  })
}

fn parse_properties(inner: &str, segment: &str) -> Result<IndexSet<String>> {
  let mut properties = IndexSet::new();
  for prop in inner.split(',') {
    let prop = prop.trim();
    if prop.is_empty() {
      continue;
    }
    if prop.contains(|c: char| c == '(' || c == ')') {
      return Err(SearchSyncError::InvalidIndexSpec(format!(
        "invalid property {prop:?} in {segment:?}"
      )));
    }
    properties.insert(prop.to_string());
  }
  Ok(properties)
}

fn validate_name(raw: &str, component: &'static str, segment: &str) -> Result<String> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(SearchSyncError::InvalidIndexSpec(format!(
      "missing {component} name in {segment:?}"
    )));
  }
  if name
    .chars()
    .any(|c| c.is_whitespace() || RESERVED_CHARS.contains(&c))
  {
    return Err(SearchSyncError::InvalidIndexSpec(format!(
      "invalid {component} name {name:?} in {segment:?}"
    )));
  }
  Ok(name.to_string())
}

/// Process-lifetime index configuration.
///
/// Bindings and the catch-all index are fixed at construction. The document
/// shape flags can be flipped through a shared reference.
#[derive(Debug)]
pub struct IndexSpecTable {
  by_label: IndexMap<String, Vec<IndexSpec>>,
  catch_all_index: Option<String>,
  fields: AtomicU8,
}

impl IndexSpecTable {
  pub fn new(
    by_label: IndexMap<String, Vec<IndexSpec>>,
    catch_all_index: Option<String>,
    fields: DocumentFields,
  ) -> Self {
    Self {
      by_label,
      catch_all_index: catch_all_index.filter(|name| !name.trim().is_empty()),
      fields: AtomicU8::new(fields.bits()),
    }
  }

  /// Parse `raw` and build a table in one step
  pub fn parse(
    raw: &str,
    catch_all_index: Option<&str>,
    include_id_field: bool,
    include_labels_field: bool,
  ) -> Result<Self> {
    let by_label = parse_index_spec(raw)?;
    let mut fields = DocumentFields::empty();
    fields.set(DocumentFields::ID, include_id_field);
    fields.set(DocumentFields::LABELS, include_labels_field);
    Ok(Self::new(
      by_label,
      catch_all_index.map(str::to_string),
      fields,
    ))
  }

  /// Bindings for `label`, empty when the label is not indexed
  pub fn specs_for(&self, label: &str) -> &[IndexSpec] {
    self
      .by_label
      .get(label)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn is_indexed_label(&self, label: &str) -> bool {
    self.by_label.contains_key(label)
  }

  pub fn indexed_labels(&self) -> impl Iterator<Item = &str> {
    self.by_label.keys().map(String::as_str)
  }

  pub fn specs(&self) -> impl Iterator<Item = &IndexSpec> {
    self.by_label.values().flatten()
  }

  pub fn catch_all_index(&self) -> Option<&str> {
    self.catch_all_index.as_deref()
  }

  pub fn catch_all_type(&self) -> &'static str {
    CATCH_ALL_TYPE
  }

  pub fn document_fields(&self) -> DocumentFields {
    DocumentFields::from_bits_truncate(self.fields.load(Ordering::Acquire))
  }

  pub fn include_id_field(&self) -> bool {
    self.document_fields().contains(DocumentFields::ID)
  }

  pub fn include_labels_field(&self) -> bool {
    self.document_fields().contains(DocumentFields::LABELS)
  }

  pub fn set_include_id_field(&self, include: bool) {
    self.set_field(DocumentFields::ID, include);
  }

  pub fn set_include_labels_field(&self, include: bool) {
    self.set_field(DocumentFields::LABELS, include);
  }

  fn set_field(&self, field: DocumentFields, include: bool) {
    if include {
      self.fields.fetch_or(field.bits(), Ordering::AcqRel);
    } else {
      self.fields.fetch_and(!field.bits(), Ordering::AcqRel);
    }
  }
}
