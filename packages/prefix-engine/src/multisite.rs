use tracing::warn;

use crate::error::MultiTenantError;
use crate::prefix::PrefixPair;

/// Per-site options rewrite for multisite networks
///
/// A network keeps one options table per site (`{prefix}{blog_id}_options`),
/// each with its own `{prefix}{blog_id}_user_roles` row. Walking the site
/// registry and running the exact-key options update per site is not
/// supported, so this always fails before touching anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiTenantOptionsUpdater;

impl MultiTenantOptionsUpdater {
    pub fn new() -> Self {
        Self
    }

    pub async fn update(&self, pair: &PrefixPair) -> Result<(), MultiTenantError> {
        warn!(
            old_prefix = %pair.old(),
            new_prefix = %pair.new_prefix(),
            "Multisite options update requested but not supported"
        );
        Err(MultiTenantError::NotImplemented)
    }
}
