use sea_orm::Condition;
use std::collections::HashMap;
use std::fmt;

use crate::errors::CrudError;

type TagFilter = Box<dyn Fn(&HashMap<String, String>) -> Condition + Send + Sync>;

/// Named filter shortcuts of one model.
///
/// The client sends `tag=<name>` (or `tags=a,b`) instead of raw
/// `filter[...]` keys; the adapter of the model turns each tag into a
/// Sea-ORM [`Condition`]. The request `context[...]` values are handed to
/// every tag filter.
///
/// ```rust,ignore
/// fn adapter() -> TagAdapter {
///     TagAdapter::new()
///         .tag("vip", |_| Condition::all().add(customer::Column::Vip.eq(true)))
///         .tag("local", |ctx| {
///             let city = ctx.get("city").cloned().unwrap_or_default();
///             Condition::all().add(customer::Column::City.eq(city))
///         })
/// }
/// ```
#[derive(Default)]
pub struct TagAdapter {
    tags: HashMap<String, TagFilter>,
}

impl TagAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the filter behind `name`
    #[must_use]
    pub fn tag<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&HashMap<String, String>) -> Condition + Send + Sync + 'static,
    {
        self.tags.insert(name.into(), Box::new(filter));
        self
    }

    #[must_use]
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// AND of the conditions behind every tag. Empty tag names (from
    /// `tags=` or `tags=a,,b`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Parse`] when a tag is not registered.
    pub fn condition(
        &self,
        tags: &[String],
        context: &HashMap<String, String>,
    ) -> Result<Condition, CrudError> {
        let mut condition = Condition::all();
        for tag in tags.iter().filter(|tag| !tag.is_empty()) {
            let filter = self
                .tags
                .get(tag)
                .ok_or_else(|| CrudError::parse(format!("Unknown tag '{tag}'")))?;
            condition = condition.add(filter(context));
        }
        Ok(condition)
    }
}

impl fmt::Debug for TagAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.tags.keys().collect();
        names.sort();
        f.debug_struct("TagAdapter").field("tags", &names).finish()
    }
}
