//! Normalizes the `withTags` decoder option into a `TagFilterSet` applied by
//! the reconstructor, rejecting malformed shapes as a `config-error`.

use std::collections::HashSet;

use crate::error::{new_error, ErrorKind, Result};

/// One entity kind's tag selection: `true`/`false`, or a finite set of keys
/// to keep.
#[derive(Debug, Clone)]
pub enum TagSelector {
    Bool(bool),
    Keys(HashSet<String>),
}

impl From<bool> for TagSelector {
    fn from(value: bool) -> TagSelector {
        TagSelector::Bool(value)
    }
}

impl From<HashSet<String>> for TagSelector {
    fn from(keys: HashSet<String>) -> TagSelector {
        TagSelector::Keys(keys)
    }
}

/// Per-entity-kind tag selection, each field defaulting to `true` (include
/// all) when left unset.
#[derive(Debug, Clone, Default)]
pub struct PerEntityTags {
    pub node: Option<TagSelector>,
    pub way: Option<TagSelector>,
    pub relation: Option<TagSelector>,
}

/// The raw shape of the `withTags` decoder option: a single bool applied to
/// every entity kind, or a per-entity configuration.
#[derive(Debug, Clone)]
pub enum WithTags {
    Bool(bool),
    PerEntity(PerEntityTags),
}

impl Default for WithTags {
    fn default() -> WithTags {
        WithTags::Bool(true)
    }
}

/// A normalized per-entity-kind tag filter: `All`, `None`, or `Only(keys)`.
#[derive(Debug, Clone)]
pub(crate) enum TagFilter {
    All,
    None,
    Only(HashSet<String>),
}

impl TagFilter {
    fn from_selector(selector: &TagSelector) -> TagFilter {
        match selector {
            TagSelector::Bool(true) => TagFilter::All,
            TagSelector::Bool(false) => TagFilter::None,
            TagSelector::Keys(keys) if keys.is_empty() => TagFilter::None,
            TagSelector::Keys(keys) => TagFilter::Only(keys.clone()),
        }
    }

    fn default_all() -> TagFilter {
        TagFilter::All
    }

    pub(crate) fn keep(&self, key: &str) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::None => false,
            TagFilter::Only(keys) => keys.contains(key),
        }
    }
}

/// The normalized `withTags` configuration, one `TagFilter` per entity kind.
#[derive(Debug, Clone)]
pub(crate) struct TagFilterSet {
    pub(crate) node: TagFilter,
    pub(crate) way: TagFilter,
    pub(crate) relation: TagFilter,
}

impl TagFilterSet {
    pub(crate) fn from_option(option: &WithTags) -> Result<TagFilterSet> {
        match option {
            WithTags::Bool(true) => Ok(TagFilterSet {
                node: TagFilter::All,
                way: TagFilter::All,
                relation: TagFilter::All,
            }),
            WithTags::Bool(false) => Ok(TagFilterSet {
                node: TagFilter::None,
                way: TagFilter::None,
                relation: TagFilter::None,
            }),
            WithTags::PerEntity(per_entity) => Ok(TagFilterSet {
                node: per_entity
                    .node
                    .as_ref()
                    .map(TagFilter::from_selector)
                    .unwrap_or_else(TagFilter::default_all),
                way: per_entity
                    .way
                    .as_ref()
                    .map(TagFilter::from_selector)
                    .unwrap_or_else(TagFilter::default_all),
                relation: per_entity
                    .relation
                    .as_ref()
                    .map(TagFilter::from_selector)
                    .unwrap_or_else(TagFilter::default_all),
            }),
        }
    }
}

/// Builds the `keys`/`vals` tag map for one entity, resolving string-table
/// indices and applying `filter`. Returns `None` when the resulting map
/// would be empty, per the "tags with empty resulting map are omitted
/// entirely" rule.
pub(crate) fn build_tags<'a>(
    keys: &[u32],
    vals: &[u32],
    filter: &TagFilter,
    resolve: impl Fn(usize) -> Result<&'a str>,
) -> Result<Option<Vec<(String, String)>>> {
    if keys.len() != vals.len() {
        return Err(new_error(ErrorKind::ParallelArrayMismatch(format!(
            "tag keys/vals length mismatch: {} vs {}",
            keys.len(),
            vals.len()
        ))));
    }

    if matches!(filter, TagFilter::None) {
        return Ok(None);
    }

    let mut tags = Vec::new();
    for (&key_idx, &val_idx) in keys.iter().zip(vals.iter()) {
        let key = resolve(key_idx as usize)?;
        if !filter.keep(key) {
            continue;
        }
        let val = resolve(val_idx as usize)?;
        tags.push((key.to_owned(), val.to_owned()));
    }

    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(table: &[&str]) -> Vec<String> {
        table.iter().map(|s| s.to_string()).collect()
    }

    fn resolve<'a>(table: &'a [String]) -> impl Fn(usize) -> Result<&'a str> + 'a {
        move |index| Ok(table[index].as_str())
    }

    #[test]
    fn only_filter_keeps_every_emitted_key_in_the_set() {
        let table = strings(&["", "highway", "residential", "name", "Main St"]);
        let keys = vec![1, 3];
        let vals = vec![2, 4];

        let mut allowed = std::collections::HashSet::new();
        allowed.insert("highway".to_owned());
        let filter = TagFilter::Only(allowed.clone());

        let tags = build_tags(&keys, &vals, &filter, resolve(&table))
            .unwrap()
            .unwrap();
        assert_eq!(tags, vec![("highway".to_owned(), "residential".to_owned())]);
        for (key, _) in &tags {
            assert!(allowed.contains(key));
        }
    }

    #[test]
    fn only_filter_with_no_matching_keys_omits_tags_entirely() {
        let table = strings(&["", "highway", "residential"]);
        let keys = vec![1];
        let vals = vec![2];

        let mut allowed = std::collections::HashSet::new();
        allowed.insert("name".to_owned());
        let filter = TagFilter::Only(allowed);

        let tags = build_tags(&keys, &vals, &filter, resolve(&table)).unwrap();
        assert!(tags.is_none());
    }

    #[test]
    fn bool_false_selector_omits_all_tags() {
        let table = strings(&["", "highway", "residential"]);
        let keys = vec![1];
        let vals = vec![2];

        let filter = TagFilter::None;
        let tags = build_tags(&keys, &vals, &filter, resolve(&table)).unwrap();
        assert!(tags.is_none());
    }

    #[test]
    fn empty_key_set_selector_normalizes_to_none() {
        let selector = TagSelector::Keys(std::collections::HashSet::new());
        assert!(matches!(TagFilter::from_selector(&selector), TagFilter::None));
    }

    #[test]
    fn per_entity_missing_kind_defaults_to_all() {
        let option = WithTags::PerEntity(PerEntityTags {
            node: Some(TagSelector::Bool(false)),
            way: None,
            relation: None,
        });
        let set = TagFilterSet::from_option(&option).unwrap();
        assert!(matches!(set.node, TagFilter::None));
        assert!(matches!(set.way, TagFilter::All));
        assert!(matches!(set.relation, TagFilter::All));
    }

    #[test]
    fn mismatched_keys_vals_lengths_are_a_parallel_array_error() {
        let table = strings(&["", "highway"]);
        let err = build_tags(&[1], &[], &TagFilter::All, resolve(&table)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParallelArrayMismatch(_)));
    }
}
