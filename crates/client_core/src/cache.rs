use std::collections::HashMap;

use shared::domain::{
    Category, Channel, ChannelId, GuildId, GuildSnapshot, Member, PartialChannel, Presence,
    PresenceStatus, Role, RoleId, User, UserId,
};

/// Normalized form of a guild snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildCache {
    pub id: GuildId,
    pub name: String,
    pub members: HashMap<UserId, Member>,
    pub channels: HashMap<ChannelId, Channel>,
    pub roles: HashMap<RoleId, Role>,
    pub categories: Vec<Category>,
}

impl From<GuildSnapshot> for GuildCache {
    fn from(snapshot: GuildSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name,
            members: snapshot
                .members
                .into_iter()
                .map(|member| (member.user.id.clone(), member))
                .collect(),
            channels: snapshot
                .channels
                .into_iter()
                .map(|channel| (channel.id.clone(), channel))
                .collect(),
            roles: snapshot
                .roles
                .into_iter()
                .map(|role| (role.id.clone(), role))
                .collect(),
            categories: snapshot.categories,
        }
    }
}

impl GuildCache {
    pub fn member(&self, user_id: &UserId) -> Option<&Member> {
        self.members.get(user_id)
    }

    pub fn channel(&self, channel_id: &ChannelId) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    pub fn role(&self, role_id: &RoleId) -> Option<&Role> {
        self.roles.get(role_id)
    }

    /// The member's roles that still exist in this guild, in the member's
    /// own order. Ids of deleted roles are skipped.
    pub fn member_roles(&self, member: &Member) -> Vec<&Role> {
        member
            .roles
            .iter()
            .filter_map(|role_id| self.roles.get(role_id))
            .collect()
    }

    /// All roles, highest precedence (most recently created) first.
    pub fn roles_by_precedence(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        sort_by_precedence(&mut roles);
        roles
    }
}

pub(crate) fn sort_by_precedence(roles: &mut [&Role]) {
    roles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Client-side cache of everything the gateway has delivered this session.
#[derive(Debug, Default)]
pub struct CacheStore {
    current_user: Option<User>,
    guilds: HashMap<GuildId, GuildCache>,
    presence: HashMap<UserId, Presence>,
    ready: bool,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&mut self, user: User) {
        self.current_user = Some(user);
    }

    /// Inserts or replaces a guild. Only ever called with a full snapshot.
    pub fn add_guild(&mut self, snapshot: GuildSnapshot) {
        let guild = GuildCache::from(snapshot);
        self.guilds.insert(guild.id.clone(), guild);
    }

    pub fn set_ready(&mut self) {
        self.ready = true;
    }

    /// Returns `false` when the guild is not cached; that is not an error.
    pub fn add_channel(&mut self, partial: &PartialChannel) -> bool {
        let Some(guild) = self.guilds.get_mut(&partial.guild_id) else {
            return false;
        };
        guild.channels.insert(
            partial.id.clone(),
            Channel {
                id: partial.id.clone(),
                index: partial.index,
                name: partial.name.clone(),
                role_permissions: Vec::new(),
                category_name: partial.category.clone(),
            },
        );
        true
    }

    pub fn remove_channel(&mut self, partial: &PartialChannel) -> bool {
        self.guilds
            .get_mut(&partial.guild_id)
            .and_then(|guild| guild.channels.remove(&partial.id))
            .is_some()
    }

    pub fn update_presence(&mut self, presence: Presence) {
        self.presence.insert(presence.user.id.clone(), presence);
    }

    pub fn remove_presence(&mut self, user_id: &UserId) {
        self.presence.remove(user_id);
    }

    /// Drops all state, including readiness. Used before re-hydrating.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn guild(&self, guild_id: &GuildId) -> Option<&GuildCache> {
        self.guilds.get(guild_id)
    }

    /// Guilds ordered by name, then id.
    pub fn guilds(&self) -> Vec<&GuildCache> {
        let mut guilds: Vec<&GuildCache> = self.guilds.values().collect();
        guilds.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        guilds
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn member(&self, guild_id: &GuildId, user_id: &UserId) -> Option<&Member> {
        self.guild(guild_id)?.member(user_id)
    }

    pub fn current_member(&self, guild_id: &GuildId) -> Option<&Member> {
        let user = self.current_user.as_ref()?;
        self.member(guild_id, &user.id)
    }

    pub fn presence(&self, user_id: &UserId) -> Option<&Presence> {
        self.presence.get(user_id)
    }

    pub fn presences(&self) -> &HashMap<UserId, Presence> {
        &self.presence
    }

    /// Users without a presence entry are offline.
    pub fn status_of(&self, user_id: &UserId) -> PresenceStatus {
        self.presence
            .get(user_id)
            .map(|presence| presence.status)
            .unwrap_or(PresenceStatus::Offline)
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
