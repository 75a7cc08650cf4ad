//! Merge rules: defaults first, later sources override earlier ones.

pub(super) mod merge_policy;

pub(super) use merge_policy::builder_with_defaults;
