use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error};

use super::registry::EntityLookup;
use crate::error::{Error, Result};
use crate::model::{Channel, Guild, Member, Role, Snowflake};

bitflags! {
    /// Permission bitfield for roles and channel overwrites.
    /// Bit positions match the platform's wire encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u64 {
        // ── General ──
        const CREATE_INSTANT_INVITE     = 1 << 0;
        const KICK_MEMBERS              = 1 << 1;
        const BAN_MEMBERS               = 1 << 2;
        const ADMINISTRATOR             = 1 << 3;
        const MANAGE_CHANNELS           = 1 << 4;
        const MANAGE_GUILD              = 1 << 5;
        const ADD_REACTIONS             = 1 << 6;
        const VIEW_AUDIT_LOG            = 1 << 7;
        const PRIORITY_SPEAKER          = 1 << 8;
        const STREAM                    = 1 << 9;
        const VIEW_CHANNEL              = 1 << 10;

        // ── Channel text ──
        const SEND_MESSAGES             = 1 << 11;
        const SEND_TTS_MESSAGES         = 1 << 12;
        const MANAGE_MESSAGES           = 1 << 13;
        const EMBED_LINKS               = 1 << 14;
        const ATTACH_FILES              = 1 << 15;
        const READ_MESSAGE_HISTORY      = 1 << 16;
        const MENTION_EVERYONE          = 1 << 17;
        const USE_EXTERNAL_EMOJIS       = 1 << 18;
        const VIEW_GUILD_INSIGHTS       = 1 << 19;

        // ── Voice ──
        const CONNECT                   = 1 << 20;
        const SPEAK                     = 1 << 21;
        const MUTE_MEMBERS              = 1 << 22;
        const DEAFEN_MEMBERS            = 1 << 23;
        const MOVE_MEMBERS              = 1 << 24;
        const USE_VAD                   = 1 << 25;

        // ── Membership ──
        const CHANGE_NICKNAME           = 1 << 26;
        const MANAGE_NICKNAMES          = 1 << 27;
        const MANAGE_ROLES              = 1 << 28;
        const MANAGE_WEBHOOKS           = 1 << 29;
        const MANAGE_EMOJIS             = 1 << 30;
        const USE_APPLICATION_COMMANDS  = 1 << 31;
        const REQUEST_TO_SPEAK          = 1 << 32;
        const MANAGE_EVENTS             = 1 << 33;

        // ── Threads ──
        const MANAGE_THREADS            = 1 << 34;
        const CREATE_PUBLIC_THREADS     = 1 << 35;
        const CREATE_PRIVATE_THREADS    = 1 << 36;
        const USE_EXTERNAL_STICKERS     = 1 << 37;
        const SEND_MESSAGES_IN_THREADS  = 1 << 38;
        const USE_EMBEDDED_ACTIVITIES   = 1 << 39;
        const MODERATE_MEMBERS          = 1 << 40;
    }
}

impl Permissions {
    /// Single-flag test. ADMINISTRATOR implies every flag.
    pub fn has_permission(self, flag: Permissions) -> bool {
        self.contains(Permissions::ADMINISTRATOR) || self.contains(flag)
    }
}

// Sent as a decimal string; unknown bits from newer API versions are dropped.
impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.bits())
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bits: u64 = raw.parse().map_err(serde::de::Error::custom)?;
        Ok(Permissions::from_bits_truncate(bits))
    }
}

/// Who a channel overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(Snowflake),
    Member(Snowflake),
}

impl OverwriteTarget {
    pub fn id(self) -> Snowflake {
        match self {
            Self::Role(id) | Self::Member(id) => id,
        }
    }
}

impl fmt::Display for OverwriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role(id) => write!(f, "role:{id}"),
            Self::Member(id) => write!(f, "member:{id}"),
        }
    }
}

/// A channel permission overwrite (allow/deny pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOverwrite", into = "RawOverwrite")]
pub struct Overwrite {
    pub target: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

impl Overwrite {
    pub fn role(id: Snowflake, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Role(id),
            allow,
            deny,
        }
    }

    pub fn member(id: Snowflake, allow: Permissions, deny: Permissions) -> Self {
        Self {
            target: OverwriteTarget::Member(id),
            allow,
            deny,
        }
    }

    /// Allowed bits with any overlapping denies removed. A malformed
    /// overwrite that both allows and denies a bit denies it.
    pub fn effective_allow(&self) -> Permissions {
        self.allow - self.deny
    }

    /// Clear the denied bits, then set the allowed ones.
    pub fn apply(&self, perms: Permissions) -> Permissions {
        (perms - self.deny) | self.effective_allow()
    }
}

#[derive(Serialize, Deserialize)]
struct RawOverwrite {
    id: Snowflake,
    #[serde(rename = "type")]
    kind: u8,
    allow: Permissions,
    deny: Permissions,
}

impl From<RawOverwrite> for Overwrite {
    fn from(raw: RawOverwrite) -> Self {
        let target = match raw.kind {
            1 => OverwriteTarget::Member(raw.id),
            _ => OverwriteTarget::Role(raw.id),
        };
        Self {
            target,
            allow: raw.allow,
            deny: raw.deny,
        }
    }
}

impl From<Overwrite> for RawOverwrite {
    fn from(ov: Overwrite) -> Self {
        let kind = match ov.target {
            OverwriteTarget::Role(_) => 0,
            OverwriteTarget::Member(_) => 1,
        };
        Self {
            id: ov.target.id(),
            kind,
            allow: ov.allow,
            deny: ov.deny,
        }
    }
}

fn find_overwrite(overwrites: &[Overwrite], target: OverwriteTarget) -> Option<&Overwrite> {
    overwrites.iter().find(|ov| ov.target == target)
}

/// Compute a member's effective permissions in a channel.
///
/// Algorithm:
///   1. Guild owner gets all permissions unconditionally.
///   2. Start with the `@everyone` role's base permissions.
///   3. OR in every other role the member holds.
///   4. If ADMINISTRATOR is set, return all permissions. Overwrites are not read.
///   5. Apply the `@everyone` overwrite (deny cleared, then allow set).
///   6. Union the denies and the allows of the member's role overwrites,
///      clear the denies, then set the allows.
///   7. Apply the member-specific overwrite last.
pub fn compute_member_permissions(
    base_everyone: Permissions,
    member_role_permissions: &[(Snowflake, Permissions)],
    overwrites: &[Overwrite],
    everyone_role_id: Snowflake,
    member_id: Snowflake,
    is_owner: bool,
) -> Permissions {
    if is_owner {
        return Permissions::all();
    }

    let held_roles = member_role_permissions
        .iter()
        .filter(|(role_id, _)| *role_id != everyone_role_id);

    let mut perms = base_everyone;
    for (_role_id, role_perms) in held_roles.clone() {
        perms |= *role_perms;
    }

    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    if overwrites.is_empty() {
        return perms;
    }

    if let Some(ov) = find_overwrite(overwrites, OverwriteTarget::Role(everyone_role_id)) {
        perms = ov.apply(perms);
    }

    let mut role_allow = Permissions::empty();
    let mut role_deny = Permissions::empty();
    for (role_id, _) in held_roles {
        if let Some(ov) = find_overwrite(overwrites, OverwriteTarget::Role(*role_id)) {
            role_allow |= ov.effective_allow();
            role_deny |= ov.deny;
        }
    }
    perms -= role_deny;
    perms |= role_allow;

    if let Some(ov) = find_overwrite(overwrites, OverwriteTarget::Member(member_id)) {
        perms = ov.apply(perms);
    }

    perms
}

/// Compute a single role's effective permissions in a channel.
///
/// Same layering as [`compute_member_permissions`] without the owner check,
/// except that bits the `@everyone` overwrite explicitly allows are exempt
/// from the role overwrite's deny.
pub fn compute_role_permissions(
    base_everyone: Permissions,
    role_id: Snowflake,
    role_permissions: Permissions,
    overwrites: &[Overwrite],
    everyone_role_id: Snowflake,
) -> Permissions {
    let mut perms = base_everyone | role_permissions;

    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::all();
    }

    let everyone_ow = find_overwrite(overwrites, OverwriteTarget::Role(everyone_role_id));
    if let Some(ov) = everyone_ow {
        perms = ov.apply(perms);
    }

    if role_id == everyone_role_id {
        return perms;
    }

    if let Some(ov) = find_overwrite(overwrites, OverwriteTarget::Role(role_id)) {
        let mut deny = ov.deny;
        if let Some(everyone) = everyone_ow {
            deny -= everyone.effective_allow();
        }
        perms -= deny;
        perms |= ov.effective_allow();
    }

    perms
}

/// The principal a permission query is about.
#[derive(Debug, Clone, Copy)]
pub enum Principal<'a> {
    Member(&'a Member),
    Role(&'a Role),
}

/// Resolves channel-scoped permissions against entity snapshots, following
/// guild and parent relations through an [`EntityLookup`].
pub struct PermissionResolver<'a, L: EntityLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: EntityLookup + ?Sized> PermissionResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn resolve(&self, channel: &Channel, principal: Principal<'_>) -> Result<Permissions> {
        match principal {
            Principal::Member(member) => self.for_member(channel, member),
            Principal::Role(role) => self.for_role(channel, role),
        }
    }

    /// Effective permissions of `member` in `channel`.
    pub fn for_member(&self, channel: &Channel, member: &Member) -> Result<Permissions> {
        if channel.is_thread() {
            let parent = self.parent_of(channel)?;
            return self.for_member(&parent, member);
        }

        let Some(guild) = self.guild_of(channel)? else {
            return Ok(Permissions::empty());
        };

        let role_perms: Vec<(Snowflake, Permissions)> = member
            .roles
            .iter()
            .filter_map(|role_id| match guild.role(*role_id) {
                Some(role) => Some((role.id, role.permissions)),
                None => {
                    debug!(role_id = %role_id, guild_id = %guild.id, "member holds unknown role, skipping");
                    None
                }
            })
            .collect();

        Ok(compute_member_permissions(
            guild.everyone_permissions(),
            &role_perms,
            &channel.overwrites,
            guild.id,
            member.user_id,
            guild.owner_id == member.user_id,
        ))
    }

    /// Effective permissions of `role` in `channel`. The role must belong to
    /// the channel's guild.
    pub fn for_role(&self, channel: &Channel, role: &Role) -> Result<Permissions> {
        if channel.is_thread() {
            let parent = self.parent_of(channel)?;
            return self.for_role(&parent, role);
        }

        let Some(guild) = self.guild_of(channel)? else {
            return Ok(Permissions::empty());
        };

        if role.guild_id != guild.id {
            return Err(Error::invalid(format!(
                "role {} does not belong to guild {} of channel {}",
                role.id, guild.id, channel.id
            )));
        }

        Ok(compute_role_permissions(
            guild.everyone_permissions(),
            role.id,
            role.permissions,
            &channel.overwrites,
            guild.id,
        ))
    }

    fn parent_of(&self, thread: &Channel) -> Result<Arc<Channel>> {
        let parent = thread
            .parent_id
            .and_then(|id| self.lookup.channel(id))
            .filter(|parent| !parent.is_thread());

        parent.ok_or_else(|| {
            error!(channel_id = %thread.id, parent_id = ?thread.parent_id, "thread has no resolvable parent channel");
            Error::BrokenEntityGraph(format!("thread {} has no resolvable parent", thread.id))
        })
    }

    /// `None` when no guild permission model applies (DMs, guild-less channels).
    fn guild_of(&self, channel: &Channel) -> Result<Option<Arc<Guild>>> {
        if channel.is_private() {
            return Ok(None);
        }
        let Some(guild_id) = channel.guild_id else {
            return Ok(None);
        };
        match self.lookup.guild(guild_id) {
            Some(guild) => Ok(Some(guild)),
            None => {
                error!(channel_id = %channel.id, guild_id = %guild_id, "channel refers to an unknown guild");
                Err(Error::BrokenEntityGraph(format!(
                    "channel {} refers to unknown guild {}",
                    channel.id, guild_id
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registry::EntityCache;
    use crate::model::ChannelType;

    const EVERYONE: Snowflake = Snowflake(100);
    const MEMBER: Snowflake = Snowflake(500);

    fn chat_defaults() -> Permissions {
        Permissions::VIEW_CHANNEL
            | Permissions::SEND_MESSAGES
            | Permissions::EMBED_LINKS
            | Permissions::ATTACH_FILES
            | Permissions::ADD_REACTIONS
            | Permissions::READ_MESSAGE_HISTORY
    }

    fn member_perms(
        base: Permissions,
        roles: &[(Snowflake, Permissions)],
        overwrites: &[Overwrite],
    ) -> Permissions {
        compute_member_permissions(base, roles, overwrites, EVERYONE, MEMBER, false)
    }

    #[test]
    fn test_bitfield_operations() {
        let perms = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(!perms.contains(Permissions::MANAGE_CHANNELS));

        let denied = perms & !Permissions::SEND_MESSAGES;
        assert!(!denied.contains(Permissions::SEND_MESSAGES));
        assert!(denied.contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_has_permission_honors_administrator() {
        assert!(Permissions::ADMINISTRATOR.has_permission(Permissions::BAN_MEMBERS));
        assert!(Permissions::BAN_MEMBERS.has_permission(Permissions::BAN_MEMBERS));
        assert!(!Permissions::KICK_MEMBERS.has_permission(Permissions::BAN_MEMBERS));
        assert!(!Permissions::empty().has_permission(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_permissions_serde_as_string() {
        let perms = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
        assert_eq!(serde_json::to_string(&perms).unwrap(), "\"3072\"");
        let back: Permissions = serde_json::from_str("\"3072\"").unwrap();
        assert_eq!(back, perms);
        // Bits beyond the known set are dropped rather than rejected.
        let future: Permissions = serde_json::from_str("\"9223372036854775808\"").unwrap();
        assert_eq!(future, Permissions::empty());
    }

    #[test]
    fn test_overwrite_wire_format() {
        let ov: Overwrite =
            serde_json::from_str(r#"{"id":"500","type":1,"allow":"2048","deny":"0"}"#).unwrap();
        assert_eq!(ov.target, OverwriteTarget::Member(MEMBER));
        assert_eq!(ov.allow, Permissions::SEND_MESSAGES);

        let json = serde_json::to_value(Overwrite::role(EVERYONE, Permissions::empty(), Permissions::VIEW_CHANNEL)).unwrap();
        assert_eq!(json["type"], 0);
        assert_eq!(json["id"], "100");
        assert_eq!(json["deny"], "1024");
    }

    #[test]
    fn test_effective_permissions_basic() {
        let perms = member_perms(chat_defaults(), &[], &[]);
        assert_eq!(perms, chat_defaults());
    }

    #[test]
    fn test_multiple_roles_permissions_are_ored() {
        let perms = member_perms(
            Permissions::VIEW_CHANNEL,
            &[
                (Snowflake(1), Permissions::KICK_MEMBERS),
                (Snowflake(2), Permissions::BAN_MEMBERS),
            ],
            &[],
        );
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(perms.contains(Permissions::KICK_MEMBERS));
        assert!(perms.contains(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_owner_gets_all_permissions_regardless_of_everything() {
        let perms = compute_member_permissions(
            Permissions::empty(),
            &[],
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::all()),
                Overwrite::member(MEMBER, Permissions::empty(), Permissions::all()),
            ],
            EVERYONE,
            MEMBER,
            true,
        );
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_administrator_bypasses_all_deny_bits() {
        let perms = member_perms(
            Permissions::VIEW_CHANNEL,
            &[(Snowflake(1), Permissions::ADMINISTRATOR)],
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::all()),
                Overwrite::role(Snowflake(1), Permissions::empty(), Permissions::all()),
                Overwrite::member(MEMBER, Permissions::empty(), Permissions::all()),
            ],
        );
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_administrator_on_everyone_role() {
        let perms = member_perms(
            Permissions::ADMINISTRATOR,
            &[],
            &[Overwrite::role(EVERYONE, Permissions::empty(), Permissions::all())],
        );
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_everyone_overwrite_deny() {
        let perms = member_perms(
            chat_defaults(),
            &[],
            &[Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES)],
        );
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_everyone_role_in_member_list_is_not_double_counted() {
        // The default role's overwrite must apply once, at @everyone precedence.
        let perms = member_perms(
            chat_defaults(),
            &[(EVERYONE, chat_defaults())],
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::role(Snowflake(7), Permissions::empty(), Permissions::empty()),
            ],
        );
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_role_overwrite_re_allows_after_everyone_deny() {
        let perms = member_perms(
            chat_defaults(),
            &[(Snowflake(1), Permissions::KICK_MEMBERS)],
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::role(Snowflake(1), Permissions::SEND_MESSAGES, Permissions::empty()),
            ],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_role_allow_reinstates_other_role_deny() {
        // Role overwrites are unioned before being applied, so an allow from
        // one role beats a deny from another.
        let perms = member_perms(
            chat_defaults(),
            &[
                (Snowflake(1), Permissions::empty()),
                (Snowflake(2), Permissions::empty()),
            ],
            &[
                Overwrite::role(Snowflake(1), Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::role(Snowflake(2), Permissions::SEND_MESSAGES, Permissions::empty()),
            ],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_multiple_role_overwrites_are_combined() {
        let perms = member_perms(
            chat_defaults(),
            &[
                (Snowflake(1), Permissions::empty()),
                (Snowflake(2), Permissions::empty()),
            ],
            &[
                Overwrite::role(Snowflake(1), Permissions::MANAGE_CHANNELS, Permissions::empty()),
                Overwrite::role(Snowflake(2), Permissions::empty(), Permissions::SEND_MESSAGES),
            ],
        );
        assert!(perms.contains(Permissions::MANAGE_CHANNELS));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_member_overwrite_takes_precedence_over_role_overwrite() {
        let perms = member_perms(
            chat_defaults(),
            &[(Snowflake(1), Permissions::KICK_MEMBERS)],
            &[
                Overwrite::role(Snowflake(1), Permissions::MANAGE_CHANNELS, Permissions::empty()),
                Overwrite::member(
                    MEMBER,
                    Permissions::empty(),
                    Permissions::MANAGE_CHANNELS | Permissions::SEND_MESSAGES,
                ),
            ],
        );
        assert!(!perms.contains(Permissions::MANAGE_CHANNELS));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::KICK_MEMBERS));
    }

    #[test]
    fn test_member_overwrite_allow_beats_everything_below() {
        let perms = member_perms(
            chat_defaults(),
            &[(Snowflake(1), Permissions::empty())],
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::role(Snowflake(1), Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::member(MEMBER, Permissions::SEND_MESSAGES, Permissions::empty()),
            ],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_overwrite_for_unrelated_principals_is_ignored() {
        let perms = member_perms(
            chat_defaults(),
            &[],
            &[
                Overwrite::role(Snowflake(9), Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::member(Snowflake(9), Permissions::empty(), Permissions::SEND_MESSAGES),
            ],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_member_overwrite_is_not_matched_as_role() {
        // Same id, wrong target kind.
        let perms = member_perms(
            chat_defaults(),
            &[],
            &[Overwrite::role(MEMBER, Permissions::empty(), Permissions::SEND_MESSAGES)],
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_overlapping_allow_and_deny_denies() {
        let perms = member_perms(
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
            &[],
            &[Overwrite::member(MEMBER, Permissions::SEND_MESSAGES, Permissions::SEND_MESSAGES)],
        );
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_everyone_base_empty_gives_no_perms() {
        assert_eq!(member_perms(Permissions::empty(), &[], &[]), Permissions::empty());
    }

    #[test]
    fn test_role_permissions_basic() {
        let perms = compute_role_permissions(
            Permissions::VIEW_CHANNEL,
            Snowflake(1),
            Permissions::KICK_MEMBERS,
            &[],
            EVERYONE,
        );
        assert_eq!(perms, Permissions::VIEW_CHANNEL | Permissions::KICK_MEMBERS);
    }

    #[test]
    fn test_role_permissions_admin_bypass() {
        let perms = compute_role_permissions(
            Permissions::empty(),
            Snowflake(1),
            Permissions::ADMINISTRATOR,
            &[Overwrite::role(Snowflake(1), Permissions::empty(), Permissions::all())],
            EVERYONE,
        );
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_role_deny_exempted_by_everyone_allow() {
        let perms = compute_role_permissions(
            Permissions::VIEW_CHANNEL,
            Snowflake(1),
            Permissions::empty(),
            &[
                Overwrite::role(EVERYONE, Permissions::SEND_MESSAGES, Permissions::empty()),
                Overwrite::role(
                    Snowflake(1),
                    Permissions::empty(),
                    Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL,
                ),
            ],
            EVERYONE,
        );
        // SEND_MESSAGES survives because @everyone explicitly allows it.
        assert!(perms.contains(Permissions::SEND_MESSAGES));
        // VIEW_CHANNEL has no @everyone allow, so the role deny sticks.
        assert!(!perms.contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_role_overwrite_allow() {
        let perms = compute_role_permissions(
            Permissions::VIEW_CHANNEL,
            Snowflake(1),
            Permissions::empty(),
            &[
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES),
                Overwrite::role(Snowflake(1), Permissions::SEND_MESSAGES, Permissions::empty()),
            ],
            EVERYONE,
        );
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_everyone_role_query_applies_its_overwrite_once() {
        let perms = compute_role_permissions(
            chat_defaults(),
            EVERYONE,
            chat_defaults(),
            &[Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES)],
            EVERYONE,
        );
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
    }

    // ────────────────────────────────────────────────────────────────
    // Resolver tests (relations followed through the registry)
    // ────────────────────────────────────────────────────────────────

    const GUILD: Snowflake = EVERYONE;
    const OWNER: Snowflake = Snowflake(1);
    const MODS: Snowflake = Snowflake(101);

    fn setup() -> EntityCache {
        let cache = EntityCache::new();
        let mut guild = Guild::new(GUILD, OWNER, chat_defaults());
        guild.insert_role(Role::new(MODS, GUILD, Permissions::KICK_MEMBERS));
        cache.upsert_guild(guild);
        cache.upsert_channel(
            Channel::new(Snowflake(200), ChannelType::Text, Some(GUILD)).with_overwrites(vec![
                Overwrite::role(EVERYONE, Permissions::empty(), Permissions::SEND_MESSAGES),
            ]),
        );
        cache
    }

    #[test]
    fn test_resolver_member() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let channel = cache.channel(Snowflake(200)).unwrap();

        let member = Member::new(MEMBER, GUILD, vec![MODS]);
        let perms = resolver.for_member(&channel, &member).unwrap();
        assert!(perms.contains(Permissions::KICK_MEMBERS));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_resolver_owner() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let channel = cache.channel(Snowflake(200)).unwrap();

        let owner = Member::new(OWNER, GUILD, vec![]);
        let perms = resolver.resolve(&channel, Principal::Member(&owner)).unwrap();
        assert_eq!(perms, Permissions::all());
    }

    #[test]
    fn test_resolver_skips_unknown_roles() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let channel = cache.channel(Snowflake(200)).unwrap();

        let member = Member::new(MEMBER, GUILD, vec![Snowflake(4040)]);
        let perms = resolver.for_member(&channel, &member).unwrap();
        assert_eq!(perms, chat_defaults() - Permissions::SEND_MESSAGES);
    }

    #[test]
    fn test_resolver_thread_uses_parent_overwrites() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        // The thread's own overwrites would grant everything; they are ignored.
        let thread = Channel::new(Snowflake(300), ChannelType::PublicThread, Some(GUILD))
            .with_parent(Snowflake(200))
            .with_overwrites(vec![Overwrite::role(EVERYONE, Permissions::all(), Permissions::empty())]);

        let member = Member::new(MEMBER, GUILD, vec![]);
        let perms = resolver.for_member(&thread, &member).unwrap();
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
        assert!(perms.contains(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_resolver_thread_without_parent_is_broken_graph() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let member = Member::new(MEMBER, GUILD, vec![]);

        let orphan = Channel::new(Snowflake(301), ChannelType::PrivateThread, Some(GUILD));
        assert!(matches!(
            resolver.for_member(&orphan, &member),
            Err(Error::BrokenEntityGraph(_))
        ));

        let dangling = orphan.clone().with_parent(Snowflake(9999));
        assert!(matches!(
            resolver.for_member(&dangling, &member),
            Err(Error::BrokenEntityGraph(_))
        ));
    }

    #[test]
    fn test_resolver_private_channel_is_empty() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let dm = Channel::new(Snowflake(400), ChannelType::Private, None);
        let owner = Member::new(OWNER, GUILD, vec![]);

        // Even the guild owner gets nothing in a DM.
        assert_eq!(resolver.for_member(&dm, &owner).unwrap(), Permissions::empty());
    }

    #[test]
    fn test_resolver_guildless_channel_is_empty() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let ch = Channel::new(Snowflake(401), ChannelType::Text, None);
        let role = Role::new(MODS, GUILD, Permissions::KICK_MEMBERS);
        assert_eq!(resolver.for_role(&ch, &role).unwrap(), Permissions::empty());
    }

    #[test]
    fn test_resolver_unknown_guild_is_broken_graph() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let ch = Channel::new(Snowflake(402), ChannelType::Text, Some(Snowflake(777)));
        let member = Member::new(MEMBER, Snowflake(777), vec![]);
        assert!(matches!(
            resolver.for_member(&ch, &member),
            Err(Error::BrokenEntityGraph(_))
        ));
    }

    #[test]
    fn test_resolver_role() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let channel = cache.channel(Snowflake(200)).unwrap();
        let guild = cache.guild(GUILD).unwrap();
        let mods = guild.role(MODS).unwrap();

        let perms = resolver.resolve(&channel, Principal::Role(mods)).unwrap();
        assert!(perms.contains(Permissions::KICK_MEMBERS));
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn test_resolver_foreign_role_is_invalid_argument() {
        let cache = setup();
        let resolver = PermissionResolver::new(&cache);
        let channel = cache.channel(Snowflake(200)).unwrap();
        let foreign = Role::new(Snowflake(55), Snowflake(888), Permissions::all());

        assert!(matches!(
            resolver.for_role(&channel, &foreign),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_overwrite_target_display() {
        assert_eq!(OverwriteTarget::Role(Snowflake(5)).to_string(), "role:5");
        assert_eq!(OverwriteTarget::Member(Snowflake(6)).to_string(), "member:6");
    }
}
