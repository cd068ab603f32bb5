//! Read-only projections of the cache used by the guild screens.

use std::collections::HashMap;

use shared::domain::{Channel, Member, Permissions, Presence, PresenceStatus, RoleId, User, UserId};

use crate::{
    cache::{sort_by_precedence, GuildCache},
    permissions::has_permission,
};

pub const DEFAULT_MEMBER_COLOR: &str = "FFFFFF";
pub const ONLINE_SECTION: &str = "Online";
pub const OFFLINE_SECTION: &str = "Offline";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarCategory {
    pub name: String,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSidebar {
    pub categories: Vec<SidebarCategory>,
    /// Whether the member may create and delete channels.
    pub can_manage: bool,
}

/// Categories in stored order, each listing the channels linked to it by
/// name that the member can view, by ascending index.
pub fn channel_sidebar(guild: &GuildCache, member: &Member) -> ChannelSidebar {
    let categories = guild
        .categories
        .iter()
        .map(|category| {
            let mut channels: Vec<Channel> = guild
                .channels
                .values()
                .filter(|channel| channel.category_name.as_deref() == Some(category.name.as_str()))
                .filter(|channel| {
                    has_permission(member, guild, Permissions::VIEW_CHANNEL, Some(channel))
                })
                .cloned()
                .collect();
            channels.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
            SidebarCategory {
                name: category.name.clone(),
                channels,
            }
        })
        .collect();

    ChannelSidebar {
        categories,
        can_manage: has_permission(member, guild, Permissions::MANAGE_CHANNELS, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub user: User,
    pub status: PresenceStatus,
    /// Hex colour without the leading `#`.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSection {
    pub label: String,
    pub members: Vec<MemberEntry>,
}

/// Members able to view `channel`, split into one section per hoisting role
/// plus a trailing offline section. Empty sections are left out.
pub fn member_list(
    guild: &GuildCache,
    channel: &Channel,
    presence: &HashMap<UserId, Presence>,
) -> Vec<MemberSection> {
    let everyone = RoleId::everyone(&guild.id);
    let mut by_role: HashMap<RoleId, Vec<MemberEntry>> = HashMap::new();
    let mut offline = Vec::new();

    for member in guild.members.values() {
        if !has_permission(member, guild, Permissions::VIEW_CHANNEL, Some(channel)) {
            continue;
        }

        let mut roles = guild.member_roles(member);
        sort_by_precedence(&mut roles);

        let status = presence
            .get(&member.user.id)
            .map(|presence| presence.status)
            .unwrap_or(PresenceStatus::Offline);
        let color = roles
            .iter()
            .find_map(|role| role.color.clone())
            .unwrap_or_else(|| DEFAULT_MEMBER_COLOR.to_string());
        let entry = MemberEntry {
            user: member.user.clone(),
            status,
            color,
        };

        if status == PresenceStatus::Offline {
            offline.push(entry);
        } else {
            let section = roles
                .first()
                .map(|role| role.id.clone())
                .unwrap_or_else(|| everyone.clone());
            by_role.entry(section).or_default().push(entry);
        }
    }

    let mut sections = Vec::new();
    for role in guild.roles_by_precedence() {
        let Some(mut members) = by_role.remove(&role.id) else {
            continue;
        };
        sort_entries(&mut members);
        let label = if role.is_everyone(&guild.id) {
            ONLINE_SECTION.to_string()
        } else {
            role.name.clone()
        };
        sections.push(MemberSection { label, members });
    }

    // The everyone role may be missing from a partial snapshot.
    if let Some(mut members) = by_role.remove(&everyone) {
        sort_entries(&mut members);
        sections.push(MemberSection {
            label: ONLINE_SECTION.to_string(),
            members,
        });
    }

    if !offline.is_empty() {
        sort_entries(&mut offline);
        sections.push(MemberSection {
            label: OFFLINE_SECTION.to_string(),
            members: offline,
        });
    }

    sections
}

fn sort_entries(entries: &mut [MemberEntry]) {
    entries.sort_by(|a, b| {
        a.user
            .display_name
            .cmp(&b.user.display_name)
            .then_with(|| a.user.id.cmp(&b.user.id))
    });
}

#[cfg(test)]
#[path = "tests/views_tests.rs"]
mod tests;
