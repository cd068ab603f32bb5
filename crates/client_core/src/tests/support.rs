use shared::domain::{
    Category, Channel, ChannelId, ChannelPermission, GuildId, GuildSnapshot, Member, Message,
    MessageId, PartialChannel, Permissions, Role, RoleId, User, UserId,
};

use crate::cache::GuildCache;

pub(crate) const GUILD: &str = "g1";

pub(crate) fn user(id: &str) -> User {
    User {
        id: UserId::from(id),
        username: id.to_string(),
        display_name: id.to_uppercase(),
        created_at: 0,
    }
}

pub(crate) fn member(id: &str, roles: &[&str]) -> Member {
    Member {
        user: user(id),
        roles: roles.iter().map(|role| RoleId::from(*role)).collect(),
        joined_at: 0,
    }
}

pub(crate) fn role(id: &str, permission: Permissions, created_at: i64) -> Role {
    Role {
        id: RoleId::from(id),
        name: id.to_string(),
        permission,
        created_at,
        color: None,
    }
}

pub(crate) fn colored_role(id: &str, created_at: i64, color: &str) -> Role {
    Role {
        color: Some(color.to_string()),
        ..role(id, Permissions::empty(), created_at)
    }
}

pub(crate) fn channel_override(
    role_id: &str,
    allowed: Permissions,
    disallowed: Permissions,
) -> ChannelPermission {
    ChannelPermission {
        role_id: RoleId::from(role_id),
        allowed,
        disallowed,
    }
}

pub(crate) fn channel(id: &str, category: Option<&str>, index: i64) -> Channel {
    Channel {
        id: ChannelId::from(id),
        index,
        name: id.to_string(),
        role_permissions: Vec::new(),
        category_name: category.map(str::to_string),
    }
}

pub(crate) fn category(name: &str, index: i64) -> Category {
    Category {
        name: name.to_string(),
        index,
        created_at: 0,
    }
}

pub(crate) fn snapshot(
    id: &str,
    members: Vec<Member>,
    channels: Vec<Channel>,
    roles: Vec<Role>,
) -> GuildSnapshot {
    let mut roles = roles;
    if !roles.iter().any(|role| role.id.as_str() == id) {
        roles.push(Role {
            name: "@everyone".to_string(),
            ..role(id, Permissions::empty(), 0)
        });
    }
    GuildSnapshot {
        id: GuildId::from(id),
        name: format!("guild {id}"),
        members,
        channels,
        roles,
        categories: Vec::new(),
    }
}

pub(crate) fn guild(members: Vec<Member>, channels: Vec<Channel>, roles: Vec<Role>) -> GuildCache {
    GuildCache::from(snapshot(GUILD, members, channels, roles))
}

pub(crate) fn partial_channel(id: &str, guild_id: &str, category: Option<&str>) -> PartialChannel {
    PartialChannel {
        id: ChannelId::from(id),
        name: id.to_string(),
        category: category.map(str::to_string),
        guild_id: GuildId::from(guild_id),
        index: 0,
    }
}

pub(crate) fn message(id: &str, author: &str, created_at: i64) -> Message {
    Message {
        id: MessageId::from(id),
        content: format!("content {id}"),
        replying_to: None,
        created_by: UserId::from(author),
        created_at,
        stream: None,
        channel_id: Some(ChannelId::from("c1")),
    }
}
