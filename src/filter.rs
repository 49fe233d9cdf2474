//! Vendor Filtering
//!
//! Decides whether a symbol belongs to a vendor-only extension. A name is
//! vendor-only when it ends with a registry extension tag that is not on the
//! always-allowed list. The tag data is explicit; the predicate is pure.

use serde::{Deserialize, Serialize};

use crate::analysis::rules::ALWAYS_ALLOWED_TAGS;

/// Allow/deny data consumed by [`VendorFilter::is_vendor_only`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorFilter {
    /// Extension tags that mark a symbol as vendor-specific
    denied: Vec<String>,
    /// Tags always permitted even though they appear in the tag list
    allowed: Vec<String>,
}

impl VendorFilter {
    /// Build a filter from registry tags and an explicit allow-list
    pub fn new<T, A>(tags: T, allowed: A) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        let mut denied: Vec<String> = Vec::new();
        for tag in tags.into_iter().map(Into::into) {
            if !allowed.contains(&tag) && !denied.contains(&tag) {
                denied.push(tag);
            }
        }
        Self { denied, allowed }
    }

    /// Filter over registry tags with the default allow-list
    pub fn with_default_allow_list<T>(tags: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::new(tags, ALWAYS_ALLOWED_TAGS.iter().copied())
    }

    /// True if `name` ends with a denied vendor tag.
    ///
    /// A name that also ends with an allowed tag (`...KHR` when `HR` were a
    /// vendor tag) is not vendor-only. Empty names never are.
    pub fn is_vendor_only(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        if self.allowed.iter().any(|t| name.ends_with(t.as_str())) {
            return false;
        }
        self.denied.iter().any(|t| name.ends_with(t.as_str()))
    }

    /// Same as [`is_vendor_only`](Self::is_vendor_only) for optional names
    pub fn is_vendor_only_opt(&self, name: Option<&str>) -> bool {
        name.map_or(false, |n| self.is_vendor_only(n))
    }

    pub fn denied_tags(&self) -> &[String] {
        &self.denied
    }

    pub fn allowed_tags(&self) -> &[String] {
        &self.allowed
    }
}
