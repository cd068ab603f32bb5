use super::*;
use crate::test_support::{channel, channel_override, guild, member, role};

#[test]
fn member_without_roles_keeps_baseline_channel_access() {
    let general = channel("c1", None, 0);
    let guild = guild(vec![member("u1", &[])], vec![general.clone()], Vec::new());
    let nobody = member("u1", &[]);

    assert!(has_permission(
        &nobody,
        &guild,
        Permissions::VIEW_CHANNEL,
        Some(&general)
    ));
    assert!(has_permission(
        &nobody,
        &guild,
        Permissions::SEND_MESSAGES,
        Some(&general)
    ));
    assert!(!has_permission(
        &nobody,
        &guild,
        Permissions::DELETE_MESSAGE,
        Some(&general)
    ));
}

#[test]
fn guild_scope_baseline_differs_from_channel_scope() {
    let guild = guild(Vec::new(), Vec::new(), Vec::new());
    let nobody = member("u1", &[]);

    assert!(has_permission(
        &nobody,
        &guild,
        Permissions::CREATE_INVITES,
        None
    ));
    assert!(!has_permission(&nobody, &guild, Permissions::VIEW_CHANNEL, None));
    assert_eq!(
        effective_permissions(&nobody, &guild, None),
        Permissions::NORMALISED_GUILD
    );
}

#[test]
fn role_grants_are_additive_and_unknown_roles_are_skipped() {
    let guild = guild(
        Vec::new(),
        Vec::new(),
        vec![
            role("mod", Permissions::DELETE_MESSAGE, 1),
            role("admin", Permissions::MANAGE_CHANNELS, 2),
        ],
    );
    let moderator = member("u1", &["mod", "deleted-role", "admin"]);

    let mask = effective_permissions(&moderator, &guild, None);
    assert!(mask.contains(Permissions::DELETE_MESSAGE | Permissions::MANAGE_CHANNELS));
    assert!(mask.contains(Permissions::NORMALISED_GUILD));
}

#[test]
fn bits_granted_nowhere_are_denied() {
    let general = channel("c1", None, 0);
    let guild = guild(
        Vec::new(),
        vec![general.clone()],
        vec![role("mod", Permissions::DELETE_MESSAGE, 1)],
    );
    let moderator = member("u1", &["mod"]);

    assert!(!has_permission(
        &moderator,
        &guild,
        Permissions::MANAGE_CHANNELS,
        Some(&general)
    ));
    assert!(!has_permission(
        &moderator,
        &guild,
        Permissions::from_bits_retain(1 << 40),
        Some(&general)
    ));
    assert!(!has_permission(
        &moderator,
        &guild,
        Permissions::empty(),
        None
    ));
}

#[test]
fn later_override_for_the_same_bit_wins() {
    let mut secret = channel("c1", None, 0);
    secret.role_permissions = vec![
        channel_override("a", Permissions::MANAGE_CHANNELS, Permissions::empty()),
        channel_override("a", Permissions::empty(), Permissions::MANAGE_CHANNELS),
    ];
    let guild = guild(
        Vec::new(),
        vec![secret.clone()],
        vec![role("a", Permissions::empty(), 1)],
    );
    let holder = member("u1", &["a"]);

    assert!(!has_permission(
        &holder,
        &guild,
        Permissions::MANAGE_CHANNELS,
        Some(&secret)
    ));

    secret.role_permissions.reverse();
    assert!(has_permission(
        &holder,
        &guild,
        Permissions::MANAGE_CHANNELS,
        Some(&secret)
    ));
}

#[test]
fn overrides_can_revoke_baseline_view_access() {
    let mut hidden = channel("c1", None, 0);
    hidden.role_permissions = vec![channel_override(
        "g1",
        Permissions::empty(),
        Permissions::VIEW_CHANNEL,
    )];
    let guild = guild(Vec::new(), vec![hidden.clone()], Vec::new());

    let everyone = member("u1", &["g1"]);
    assert!(!has_permission(
        &everyone,
        &guild,
        Permissions::VIEW_CHANNEL,
        Some(&hidden)
    ));

    let roleless = member("u2", &[]);
    assert!(has_permission(
        &roleless,
        &guild,
        Permissions::VIEW_CHANNEL,
        Some(&hidden)
    ));
}

#[test]
fn overrides_for_roles_the_member_lacks_are_ignored() {
    let mut staff_only = channel("c1", None, 0);
    staff_only.role_permissions = vec![channel_override(
        "staff",
        Permissions::DELETE_MESSAGE,
        Permissions::empty(),
    )];
    let guild = guild(
        Vec::new(),
        vec![staff_only.clone()],
        vec![role("staff", Permissions::empty(), 1)],
    );

    assert!(!has_permission(
        &member("u1", &[]),
        &guild,
        Permissions::DELETE_MESSAGE,
        Some(&staff_only)
    ));
    assert!(has_permission(
        &member("u2", &["staff"]),
        &guild,
        Permissions::DELETE_MESSAGE,
        Some(&staff_only)
    ));
}
