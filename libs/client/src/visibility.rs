//! Advisory UI visibility gating
//!
//! Page elements may carry a `data-permission` or `data-role` attribute;
//! after page initialization, elements whose requirement the cached user
//! does not satisfy are hidden. Untagged elements are never touched.
//!
//! Hiding is cosmetic. The server enforces authorization on every request
//! regardless of what the page shows.

use crate::session::CachedUser;

/// Authorization requirement parsed from an element's attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTag {
    pub permission: Option<String>,
    pub role: Option<String>,
}

impl ElementTag {
    /// Requirement for an element with no tags: always visible
    pub fn untagged() -> Self {
        Self::default()
    }

    /// Require a permission code
    pub fn permission(code: impl Into<String>) -> Self {
        Self {
            permission: Some(code.into()),
            role: None,
        }
    }

    /// Require a role code
    pub fn role(code: impl Into<String>) -> Self {
        Self {
            permission: None,
            role: Some(code.into()),
        }
    }

    /// Parse the tag from an element's attribute list
    pub fn from_attrs<'a>(attrs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut tag = Self::default();
        for (name, value) in attrs {
            match name {
                "data-permission" => tag.permission = Some(value.to_string()),
                "data-role" => tag.role = Some(value.to_string()),
                _ => {}
            }
        }
        tag
    }

    /// Whether the element stays visible for `user`
    ///
    /// Both tags must be satisfied when both are present. An untagged
    /// element is visible to everyone, including anonymous visitors.
    pub fn is_visible(&self, user: Option<&CachedUser>) -> bool {
        if self.permission.is_none() && self.role.is_none() {
            return true;
        }

        let Some(user) = user else {
            return false;
        };

        if let Some(code) = &self.permission {
            if !user.has_permission(code) {
                return false;
            }
        }
        if let Some(code) = &self.role {
            if !user.has_role(code) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn normal_user() -> CachedUser {
        CachedUser {
            id: Uuid::new_v4(),
            username: "normal".to_string(),
            roles: vec!["normal".to_string()],
            permissions: vec!["stock.data.view".to_string(), "strategy.view".to_string()],
        }
    }

    #[test]
    fn admin_tagged_element_hidden_for_normal_user() {
        let tag = ElementTag::role("admin");
        assert!(!tag.is_visible(Some(&normal_user())));
    }

    #[test]
    fn untagged_element_is_never_hidden() {
        let tag = ElementTag::untagged();
        assert!(tag.is_visible(Some(&normal_user())));
        assert!(tag.is_visible(None));
    }

    #[test]
    fn permission_tag_follows_the_cached_closure() {
        let user = normal_user();
        assert!(ElementTag::permission("strategy.view").is_visible(Some(&user)));
        assert!(!ElementTag::permission("strategy.delete").is_visible(Some(&user)));
    }

    #[test]
    fn tagged_elements_are_hidden_from_anonymous_visitors() {
        assert!(!ElementTag::role("normal").is_visible(None));
        assert!(!ElementTag::permission("stock.data.view").is_visible(None));
    }

    #[test]
    fn both_tags_must_hold_together() {
        let user = normal_user();
        let tag = ElementTag {
            permission: Some("strategy.view".to_string()),
            role: Some("admin".to_string()),
        };
        assert!(!tag.is_visible(Some(&user)));
    }

    #[test]
    fn attrs_parse_into_a_tag() {
        let tag = ElementTag::from_attrs([
            ("class", "btn btn-danger"),
            ("data-permission", "strategy.delete"),
        ]);
        assert_eq!(tag.permission.as_deref(), Some("strategy.delete"));
        assert_eq!(tag.role, None);
    }
}
