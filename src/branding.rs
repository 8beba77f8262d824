//! Institutional branding and workspace identity, both persisted in the KV store.

use tracing::info;
use uuid::Uuid;

use crate::domain::{BrandingConfig, BrandingPatch, UserProfile};
use crate::error::{StudioError, StudioResult};
use crate::storage::{load_json, save_json, KvStore, BRANDING_KEY, PROFILE_KEY};

pub fn load_branding(store: &dyn KvStore) -> StudioResult<BrandingConfig> {
  Ok(load_json(store, BRANDING_KEY)?.unwrap_or_default())
}

pub fn save_branding(store: &dyn KvStore, branding: &BrandingConfig) -> StudioResult<()> {
  save_json(store, BRANDING_KEY, branding)?;
  Ok(())
}

/// Merge a settings-form patch. Empty `logoUrl` removes the logo.
pub fn apply_patch(current: &BrandingConfig, patch: BrandingPatch) -> StudioResult<BrandingConfig> {
  let mut next = current.clone();
  if let Some(name) = patch.institution_name {
    next.institution_name = name.trim().to_string();
  }
  if let Some(name) = patch.instructor_name {
    next.instructor_name = name.trim().to_string();
  }
  if let Some(url) = patch.logo_url {
    next.logo_url = if url.trim().is_empty() { None } else { Some(url) };
  }
  if let Some(color) = patch.primary_color {
    if !is_hex_color(&color) {
      return Err(StudioError::InvalidRequest(format!("primaryColor must be #rgb or #rrggbb, got {color:?}")));
    }
    next.primary_color = color;
  }
  if let Some(theme) = patch.theme {
    next.theme = theme;
  }
  Ok(next)
}

fn is_hex_color(s: &str) -> bool {
  let Some(hex) = s.strip_prefix('#') else { return false };
  matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Workspace identity; created once with a fresh id.
pub fn load_or_create_profile(store: &dyn KvStore) -> StudioResult<UserProfile> {
  if let Some(profile) = load_json::<UserProfile>(store, PROFILE_KEY)? {
    return Ok(profile);
  }
  let profile = UserProfile { id: Uuid::new_v4().to_string(), display_name: "Local workspace".into() };
  save_json(store, PROFILE_KEY, &profile)?;
  info!(target: "studio", id = %profile.id, "Created local workspace profile");
  Ok(profile)
}
