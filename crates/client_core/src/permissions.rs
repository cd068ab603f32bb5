//! Effective permission resolution.
//!
//! Role grants are purely additive at guild scope. Inside a channel, the
//! channel's overrides for the member's roles are applied afterwards in the
//! order they are stored, allow before deny, so a later override wins per
//! bit. Nothing here is cached; callers recompute from the current cache.

use shared::domain::{Channel, Member, Permissions};

use crate::cache::GuildCache;

pub fn effective_permissions(
    member: &Member,
    guild: &GuildCache,
    channel: Option<&Channel>,
) -> Permissions {
    let roles = guild.member_roles(member);

    let mut mask = match channel {
        None => Permissions::NORMALISED_GUILD,
        Some(_) => Permissions::NORMALISED_CHANNEL,
    };
    for role in &roles {
        mask.insert(role.permission);
    }

    if let Some(channel) = channel {
        for channel_permission in &channel.role_permissions {
            if roles.iter().any(|role| role.id == channel_permission.role_id) {
                mask.insert(channel_permission.allowed);
                mask.remove(channel_permission.disallowed);
            }
        }
    }

    mask
}

/// True when any bit of `requested` survives resolution.
pub fn has_permission(
    member: &Member,
    guild: &GuildCache,
    requested: Permissions,
    channel: Option<&Channel>,
) -> bool {
    effective_permissions(member, guild, channel).intersects(requested)
}

#[cfg(test)]
#[path = "tests/permissions_tests.rs"]
mod tests;
