//! KISSlicer path-type classification.
//!
//! KISSlicer marks the start of each tool path with a comment like
//! `; 'Support Interface Path', 1.9 [feed mm/s], 30.0 [head mm/s]`.
//! CraftWare colors paths by its own `;segType:` tags instead, so this
//! module maps the slicer's label to the viewer's segment tag.

/// One slicer-label to viewer-tag mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathTypeEntry {
    pub label: &'static str,
    pub tag: &'static str,
}

/// Ordered lookup table; first exact match wins.
///
/// Lookup compares label length before content, so `Pillar` never matches
/// inside `Prime Pillar`.
pub const PATH_TYPES: &[PathTypeEntry] = &[
    PathTypeEntry { label: "Crown", tag: "InnerHair" },
    PathTypeEntry { label: "Loop", tag: "Loop" },
    PathTypeEntry { label: "Perimeter", tag: "Perimeter" },
    PathTypeEntry { label: "Pillar", tag: "Raft" },
    PathTypeEntry { label: "Prime Pillar", tag: "Skirt" },
    PathTypeEntry { label: "Raft", tag: "Raft" },
    PathTypeEntry { label: "Skirt", tag: "Skirt" },
    PathTypeEntry { label: "Solid", tag: "HShell" },
    PathTypeEntry { label: "Sparse Infill", tag: "Infill" },
    PathTypeEntry { label: "Stacked Sparse Infill", tag: "Infill" },
    PathTypeEntry { label: "Support (may Stack)", tag: "Support" },
    PathTypeEntry { label: "Support Interface", tag: "SoftSupport" },
];

/// Comment prefix that introduces a path-type annotation: `; '`.
const LABEL_PREFIX: &[u8] = b"; '";

/// Literal that terminates the label inside the annotation comment.
const PATH_SUFFIX: &[u8] = b" Path', ";

/// Extract the path label from a KISSlicer annotation comment and map it to
/// a CraftWare segment tag.
///
/// Returns `None` for lines that are not path annotations or whose label is
/// not in the table; such lines pass through unannotated. Matching is
/// case-sensitive and exact, with no trimming.
pub fn segment_type(line: &[u8]) -> Option<&'static str> {
    let rest = line.strip_prefix(LABEL_PREFIX)?;
    let label_end = find(rest, PATH_SUFFIX)?;
    let label = &rest[..label_end];

    PATH_TYPES
        .iter()
        .find(|entry| entry.label.as_bytes() == label)
        .map(|entry| entry.tag)
}

/// Byte-wise substring search; returns the offset of the first occurrence.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
