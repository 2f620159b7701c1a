pub(crate) mod anchors;
pub(crate) mod attributes;
pub(crate) mod author_revision;
