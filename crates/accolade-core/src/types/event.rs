//! Game events consumed by the engine.
//!
//! Events arrive pre-typed from the event source collaborator; the wire
//! format is out of scope. Each event names the player subject that caused
//! it, optional account/guild linkage for scope routing, the activity kind
//! with its parameters, and a context snapshot the condition matcher reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::ids::SubjectId;

/// The activity a game event reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    KillCreature { entry: u32 },
    KillCreatureType { creature_type: u32 },
    KilledByCreature { entry: u32 },
    KilledByPlayer,
    Death,
    WinBattleground { map: u32 },
    LoseBattleground { map: u32 },
    CompleteBattleground { map: u32 },
    WinRatedBattleground,
    WinArena { map: u32 },
    PlayArena { map: u32 },
    WinDuel,
    LoseDuel,
    HonorableKill,
    ReachLevel { level: u32 },
    ReachSkillLevel { skill: u32, level: u32 },
    LearnSpell { spell: u32 },
    LearnSkillLine { skill_line: u32, spells: u32 },
    CastSpell { spell: u32 },
    BeSpellTarget { spell: u32 },
    AuraRemoved { spell: u32 },
    CompleteQuest { quest: u32, zone: u32, daily: bool },
    AcceptQuest { quest: u32 },
    AbandonQuest { quest: u32 },
    CompleteAchievement { achievement: u32, points: u32 },
    GainReputation { faction: u32, standing: i32 },
    ExploreArea { area: u32 },
    EnterArea { area: u32 },
    LeaveArea { area: u32 },
    OwnItem { item: u32, count: u64 },
    UseItem { item: u32 },
    LootItem { item: u32, count: u64, loot_type: u32 },
    EquipItem { item: u32, item_level: u32, quality: u32 },
    LootMoney { amount: u64 },
    MoneySpent { sink: MoneySink, amount: u64 },
    UseGameObject { entry: u32 },
    FishInGameObject { entry: u32 },
    CatchFromPool,
    DamageDone { amount: u64 },
    DamageReceived { amount: u64 },
    HealingDone { amount: u64 },
    HealingReceived { amount: u64 },
    HighestHitDealt { amount: u64 },
    HighestHitReceived { amount: u64 },
    HighestPersonalRating { bracket: u32, rating: u32 },
    HighestTeamRating { bracket: u32, rating: u32 },
    CurrencyGained { currency: u32, total: u64 },
    DoEmote { emote: u32 },
    FallWithoutDying { distance: u32 },
    BuyBankSlot,
    VisitBarberShop,
    RollNeed { item: u32 },
    RollGreed { item: u32 },
    ReleaseSpirit,
    CompleteDungeonEncounter { encounter: u32 },
    CompleteLfgDungeon { dungeon: u32 },
    CompleteChallengeMode { map: u32, medal: u32 },
    CompleteScenario { scenario: u32 },
    ScenarioStage { scenario: u32, stage: u32 },
    ReachGuildLevel { level: u32 },
    GroupJoined,
    GroupLeft,
    Login,
    /// Scripted event with an opaque id; also the `TimedType::Event` trigger.
    ScriptedEvent { event: u32 },
    /// Out-of-band completion of a specific criterion.
    ManualComplete { criterion: u32 },
}

/// Where money left the wallet. Parameter to `MoneySpent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoneySink {
    Talents,
    Travel,
    Barber,
    Mail,
    GuildRepairs,
}

/// An aura present on an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraInfo {
    /// Spell id of the aura.
    pub spell: u32,
    /// Aura effect type.
    pub aura_type: u32,
}

/// Snapshot of an actor (event source or target) the matcher reads.
///
/// Fields the event source does not know are left `None`; conditions that
/// need them then fail closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorInfo {
    /// Creature entry, when the actor is a creature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature_entry: Option<u32>,
    /// Creature type (beast, undead, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature_type: Option<u32>,
    /// Creature family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature_family: Option<u32>,
    /// Whether the actor is a player.
    pub is_player: bool,
    /// Race, when the actor is a player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<u32>,
    /// Class, when the actor is a player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<u32>,
    /// Level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    /// Current health.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u64>,
    /// Current health percentage (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_pct: Option<u32>,
    /// Whether the actor is alive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    /// Whether the actor is hostile to the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostile: Option<bool>,
    /// Area the actor is in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    /// Zone the actor is in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<u32>,
    /// Drunk value (inebriation), players only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drunk_value: Option<u32>,
    /// Auras currently on the actor.
    pub auras: Vec<AuraInfo>,
}

impl ActorInfo {
    /// A player actor at the given level.
    pub fn player(level: u32) -> Self {
        Self {
            is_player: true,
            level: Some(level),
            alive: Some(true),
            ..Default::default()
        }
    }

    /// A creature actor with the given entry.
    pub fn creature(entry: u32) -> Self {
        Self {
            creature_entry: Some(entry),
            ..Default::default()
        }
    }

    /// Whether the actor carries the given aura.
    pub fn has_aura(&self, spell: u32) -> bool {
        self.auras.iter().any(|a| a.spell == spell)
    }

    /// Whether the actor carries an aura of the given effect type.
    pub fn has_aura_type(&self, aura_type: u32) -> bool {
        self.auras.iter().any(|a| a.aura_type == aura_type)
    }
}

/// Persistent state of the acting player the matcher may consult.
///
/// Conditions on quest state, known spells, reputation and the like read
/// this profile; an absent profile fails those conditions closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    /// Quests currently in the log.
    pub quests_on: HashSet<u32>,
    /// Quests completed (objectives done).
    pub quests_completed: HashSet<u32>,
    /// Quests rewarded (turned in).
    pub quests_rewarded: HashSet<u32>,
    /// Achievements earned.
    pub achievements: HashSet<u32>,
    /// Spells known.
    pub spells: HashSet<u32>,
    /// Item counts by entry.
    pub items: HashMap<u32, u64>,
    /// Reputation standing by faction.
    pub reputation: HashMap<u32, i32>,
    /// Skill values by skill line.
    pub skills: HashMap<u32, u32>,
    /// Honor level.
    pub honor_level: u32,
}

/// Location and grouping context shared by source and target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldContext {
    /// Map the event happened on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<u32>,
    /// Map difficulty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<u32>,
    /// Group size, `None` when not grouped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_size: Option<u32>,
}

/// A discrete typed game event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// The player subject that caused the event.
    pub subject: SubjectId,
    /// Account the subject belongs to, for account-scoped criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<SubjectId>,
    /// Guild the subject belongs to, for guild-scoped criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild: Option<SubjectId>,
    /// Activity kind and parameters.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Source actor snapshot.
    #[serde(default)]
    pub source: ActorInfo,
    /// Target actor snapshot, when the activity has a target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActorInfo>,
    /// Persistent player state for profile conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PlayerProfile>,
    /// Location/group context.
    #[serde(default)]
    pub world: WorldContext,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
}

impl GameEvent {
    /// Create an event for a player subject with a defaulted context.
    pub fn new(subject: SubjectId, kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            subject,
            account: None,
            guild: None,
            kind,
            source: ActorInfo::default(),
            target: None,
            profile: None,
            world: WorldContext::default(),
            timestamp,
        }
    }

    /// Set the account linkage.
    pub fn with_account(mut self, account: SubjectId) -> Self {
        self.account = Some(account);
        self
    }

    /// Set the guild linkage.
    pub fn with_guild(mut self, guild: SubjectId) -> Self {
        self.guild = Some(guild);
        self
    }

    /// Set the source actor snapshot.
    pub fn with_source(mut self, source: ActorInfo) -> Self {
        self.source = source;
        self
    }

    /// Set the target actor snapshot.
    pub fn with_target(mut self, target: ActorInfo) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the player profile.
    pub fn with_profile(mut self, profile: PlayerProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Set the world context.
    pub fn with_world(mut self, world: WorldContext) -> Self {
        self.world = world;
        self
    }
}
