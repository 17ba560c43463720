use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::provider::GeneratedImage;
use crate::state::AppState;

lazy_static! {
    static ref NON_SLUG: Regex = Regex::new(r"[^a-z0-9]+").expect("valid slug regex");
}

pub fn image_prompt(name: &str, ingredients: &[String]) -> String {
    if ingredients.is_empty() {
        format!(
            "A professional food photograph of {name}, plated on a simple dish, \
             natural light, top-down view."
        )
    } else {
        format!(
            "A professional food photograph of {name}, made with {}. \
             Plated on a simple dish, natural light, top-down view.",
            ingredients.join(", ")
        )
    }
}

fn slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let s = NON_SLUG.replace_all(&lowered, "-");
    let s = s.trim_matches('-');
    if s.is_empty() {
        "meal".into()
    } else {
        s.chars().take(48).collect::<String>().trim_end_matches('-').to_string()
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn object_key(name: &str, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("meals/generated/{}-{}.{}", slug(name), Uuid::new_v4(), ext)
}

/// Asks the image provider for a picture of the meal and returns a URL for it.
/// Encoded images are stored in object storage first.
pub async fn generate_meal_image(
    st: &AppState,
    name: &str,
    ingredients: &[String],
) -> Result<String, ApiError> {
    let prompt = image_prompt(name, ingredients);
    match st.images.generate_image(&prompt).await? {
        GeneratedImage::Url(url) => Ok(url),
        GeneratedImage::Encoded {
            bytes,
            content_type,
        } => {
            let key = object_key(name, content_type);
            st.storage
                .put_object(&key, bytes, content_type)
                .await
                .with_context(|| format!("put_object {}", key))?;
            let url = st
                .storage
                .presign_get(&key, st.config.storage.url_ttl_secs)
                .await
                .with_context(|| format!("presign url for {}", key))?;
            info!(%key, "meal image stored");
            Ok(url)
        }
    }
}
