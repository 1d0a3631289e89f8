//! RESTful resource routes.

use std::fmt;

use crate::decorators::DecoratorError;
use crate::parser::Method;

/// The six conventional resource actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Index,
    Show,
    Create,
    Update,
    Patch,
    Delete,
}

impl ResourceAction {
    pub const ALL: [ResourceAction; 6] = [
        ResourceAction::Index,
        ResourceAction::Show,
        ResourceAction::Create,
        ResourceAction::Update,
        ResourceAction::Patch,
        ResourceAction::Delete,
    ];

    pub fn method(&self) -> Method {
        match self {
            ResourceAction::Index | ResourceAction::Show => Method::GET,
            ResourceAction::Create => Method::POST,
            ResourceAction::Update => Method::PUT,
            ResourceAction::Patch => Method::PATCH,
            ResourceAction::Delete => Method::DELETE,
        }
    }

    /// Whether the route addresses one member (`/:id`) rather than the collection.
    pub fn has_id(&self) -> bool {
        !matches!(self, ResourceAction::Index | ResourceAction::Create)
    }

    /// The conventional handler name.
    pub fn handler_name(&self) -> &'static str {
        match self {
            ResourceAction::Index => "index",
            ResourceAction::Show => "show",
            ResourceAction::Create => "create",
            ResourceAction::Update => "update",
            ResourceAction::Patch => "patch",
            ResourceAction::Delete => "delete",
        }
    }

    /// Route path relative to the resource's collection path.
    pub fn relative_path(&self) -> &'static str {
        if self.has_id() { "/:id" } else { "" }
    }

    pub fn from_handler_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.handler_name() == name)
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler_name())
    }
}

/// Expands a dotted resource name into its route path.
///
/// Every segment but the last is followed by a placeholder for the parent's
/// identifier; `with_id` appends the member placeholder `:id`.
///
/// ```
/// use microhttp_controllers::decorators::resource_path;
///
/// assert_eq!(resource_path("photos", false).unwrap(), "/photos");
/// assert_eq!(resource_path("photos.comments", false).unwrap(), "/photos/:photoId/comments");
/// assert_eq!(resource_path("photos.comments", true).unwrap(), "/photos/:photoId/comments/:id");
/// ```
pub fn resource_path(name: &str, with_id: bool) -> Result<String, DecoratorError> {
    let segments: Vec<&str> = name.split('.').collect();
    let valid = |segment: &&str| {
        !segment.is_empty()
            && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    if !segments.iter().all(valid) {
        return Err(DecoratorError::InvalidResourceName(name.to_string()));
    }

    let mut path = String::new();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        path.push('/');
        path.push_str(segment);
        if i < last {
            path.push_str("/:");
            path.push_str(&singular(segment));
            path.push_str("Id");
        }
    }
    if with_id {
        path.push_str("/:id");
    }
    Ok(path)
}

/// Naive English singular used for placeholder names: `categories` → `category`,
/// `users` → `user`; words ending in `ss` are left alone.
fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}
