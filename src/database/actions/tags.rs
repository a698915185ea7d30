use crate::{
    cache::cache::{CacheKeyType, ReferenceCache, TagList},
    database::{
        error::ApiError,
        schema::{Id, NewTag, Tag},
        store::Store,
    },
    jwt::SessionData,
    permissions::ActionType,
    NAME_MAX_LENGTH, TAG_COLOR_LENGTH,
};

use super::validate_name;

pub async fn list_tags<S: Store>(store: &S, cache: &ReferenceCache) -> Result<Vec<Tag>, ApiError> {
    let list = cache
        .get_or_fetch(CacheKeyType::Tags, || async {
            store.list_tags().await.map(|tags| TagList { tags })
        })
        .await?;

    Ok(list.tags)
}

pub async fn get_tag<S: Store>(store: &S, id: Id) -> Result<Tag, ApiError> {
    store
        .get_tag(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag not found"))
}

/// `#RRGGBB`, stored upper-case.
pub fn validate_color(color: &str) -> Result<String, ApiError> {
    let color = color.trim();
    let valid = color.len() == TAG_COLOR_LENGTH
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        return Err(ApiError::validation("Color must be a hex code like #E26C2D"));
    }
    Ok(color.to_ascii_uppercase())
}

pub fn validate_slug(slug: &str) -> Result<String, ApiError> {
    let slug = validate_name("slug", slug, NAME_MAX_LENGTH)?;

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(
            "Slug may only contain letters, numbers, hyphens and underscores",
        ));
    }
    Ok(slug)
}

pub async fn create_tag<S: Store>(
    store: &S,
    cache: &ReferenceCache,
    session: &SessionData,
    form: NewTag,
) -> Result<Tag, ApiError> {
    session.authenticate(ActionType::ManageTags)?;

    let tag = store
        .create_tag(NewTag {
            name: validate_name("name", &form.name, NAME_MAX_LENGTH)?,
            color: validate_color(&form.color)?,
            slug: validate_slug(&form.slug)?,
        })
        .await?;

    cache.invalidate(CacheKeyType::Tags).await;
    log::info!("Created tag {} ({})", tag.slug, tag.id);

    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_must_be_hex_codes() {
        assert_eq!(validate_color("#e26c2d"), Ok(String::from("#E26C2D")));
        assert!(validate_color("E26C2D").is_err());
        assert!(validate_color("#E26C2").is_err());
        assert!(validate_color("#GGGGGG").is_err());
    }

    #[test]
    fn slugs_are_url_safe() {
        assert_eq!(validate_slug("late-night_snacks"), Ok(String::from("late-night_snacks")));
        assert!(validate_slug("late night").is_err());
        assert!(validate_slug("").is_err());
    }
}
