//! Criterion definitions.
//!
//! A criterion is an atomic trackable condition ("kill creature X", "reach
//! level Y"). Definitions are immutable after load; identity is the id.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::CriterionId;

/// The kind of game activity a criterion tracks.
///
/// Definitions arrive pre-parsed; numeric identifiers of the authoring data
/// are not preserved. Kinds with no matcher implementation are treated as
/// never-matching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CriteriaType {
    KillCreature,
    WinBattleground,
    CompleteArchaeologyProjects,
    SurveyGameObject,
    ReachLevel,
    ClearDigsite,
    ReachSkillLevel,
    CompleteAchievement,
    CompleteQuestCount,
    CompleteDailyQuestStreak,
    CompleteQuestsInZone,
    CurrencyGained,
    DamageDone,
    CompleteDailyQuest,
    CompleteBattleground,
    DeathAtMap,
    Death,
    DeathInDungeon,
    CompleteRaid,
    KilledByCreature,
    ManualCompleteCriteria,
    KilledByPlayer,
    FallWithoutDying,
    DeathsFrom,
    CompleteQuest,
    BeSpellTarget,
    CastSpell,
    BgObjectiveCapture,
    HonorableKillAtArea,
    WinArena,
    PlayArena,
    LearnSpell,
    HonorableKill,
    OwnItem,
    WinRatedArena,
    HighestTeamRating,
    HighestPersonalRating,
    LearnSkillLevel,
    UseItem,
    LootItem,
    ExploreArea,
    OwnRank,
    BuyBankSlot,
    GainReputation,
    GainExaltedReputation,
    VisitBarberShop,
    EquipEpicItem,
    RollNeedOnLoot,
    RollGreedOnLoot,
    HkClass,
    HkRace,
    DoEmote,
    HealingDone,
    GetKillingBlows,
    EquipItem,
    MoneyFromVendors,
    GoldSpentForTalents,
    NumberOfTalentResets,
    MoneyFromQuestReward,
    GoldSpentForTravelling,
    DefeatCreatureGroup,
    GoldSpentAtBarber,
    GoldSpentForMail,
    LootMoney,
    UseGameObject,
    SpecialPvpKill,
    CompleteChallengeMode,
    FishInGameObject,
    SendEvent,
    OnLogin,
    LearnSkillLineSpells,
    WinDuel,
    LoseDuel,
    KillCreatureType,
    GoldEarnedByAuctions,
    CreateAuction,
    HighestAuctionBid,
    WonAuctions,
    HighestAuctionSold,
    HighestGoldValueOwned,
    GainReveredReputation,
    GainHonoredReputation,
    KnownFactions,
    LootEpicItem,
    ReceiveEpicItem,
    RollNeed,
    RollGreed,
    ReleaseSpirit,
    OwnPet,
    HighestHitDealt,
    HighestHitReceived,
    TotalDamageReceived,
    HighestHealCast,
    TotalHealingReceived,
    HighestHealingReceived,
    QuestAbandoned,
    FlightPathsTaken,
    LootType,
    LearnSkillLine,
    EarnHonorableKill,
    AcceptedSummonings,
    EarnAchievementPoints,
    CompleteLfgDungeon,
    UseLfdToGroupWithPlayers,
    SpentGoldGuildRepairs,
    ReachGuildLevel,
    CraftItemsGuild,
    CatchFromPool,
    BuyGuildBankSlots,
    EarnGuildAchievementPoints,
    WinRatedBattleground,
    ReachBgRating,
    BuyGuildTabard,
    CompleteQuestsGuild,
    HonorableKillsGuild,
    KillCreatureTypeGuild,
    CompleteGuildChallengeType,
    CompleteGuildChallenge,
    CompleteScenarioCount,
    CompleteScenario,
    OwnBattlePet,
    OwnBattlePetCount,
    CaptureBattlePet,
    WinPetBattle,
    LevelBattlePet,
    EnterArea,
    LeaveArea,
    CompleteDungeonEncounter,
    PlaceGarrisonBuilding,
    UpgradeGarrison,
    CompleteGarrisonMission,
    RecruitGarrisonFollower,
    OwnToy,
    OwnToyCount,
    OwnHeirlooms,
    ArtifactPowerEarned,
    ArtifactTraitsUnlocked,
    HonorLevelReached,
    PrestigeReached,
    OrderHallTalentLearned,
    AppearanceUnlockedBySlot,
    OrderHallRecruitTroop,
    CompleteWorldQuest,
    TransmogSetUnlocked,
    GainParagonReputation,
    EarnHonorXp,
    RelicTalentUnlocked,
    ReachAccountHonorLevel,
    HeartOfAzerothArtifactPowerEarned,
    HeartOfAzerothLevelReached,
}

/// Comparison operator used by numeric conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Equal,
    Greater,
    Lower,
}

impl Cmp {
    /// Apply the comparison to `actual` against `expected`.
    ///
    /// Comparisons operate on the same integer width as stored progress; no
    /// rounding is involved.
    pub fn matches(&self, actual: u64, expected: u64) -> bool {
        match self {
            Cmp::Equal => actual == expected,
            Cmp::Greater => actual > expected,
            Cmp::Lower => actual < expected,
        }
    }

    /// Signed variant for standings that can be negative.
    pub fn matches_signed(&self, actual: i64, expected: i64) -> bool {
        match self {
            Cmp::Equal => actual == expected,
            Cmp::Greater => actual > expected,
            Cmp::Lower => actual < expected,
        }
    }
}

/// An additional predicate attached to a criterion.
///
/// All conditions on a criterion must hold for an event to count. Kinds the
/// matcher does not implement are carried as `Unknown` and never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    TargetCreatureEntry { entry: u32 },
    TargetMustBePlayer,
    TargetMustBeDead,
    TargetMustBeEnemy,
    SourceIsAlive,
    SourceHasAura { spell: u32 },
    SourceHasAuraType { aura_type: u32 },
    TargetHasAura { spell: u32 },
    TargetHasAuraType { aura_type: u32 },
    ItemLevelMin { level: u32 },
    ItemQualityMin { quality: u32 },
    ItemQualityEquals { quality: u32 },
    SourceAreaOrZone { area: u32 },
    TargetAreaOrZone { area: u32 },
    SourceMap { map: u32 },
    MapDifficulty { difficulty: u32 },
    SourceRace { race: u32 },
    SourceClass { class: u32 },
    TargetRace { race: u32 },
    TargetClass { class: u32 },
    SourceLevel { cmp: Cmp, level: u32 },
    TargetLevel { cmp: Cmp, level: u32 },
    SourceHealthPct { cmp: Cmp, pct: u32 },
    TargetHealthPct { cmp: Cmp, pct: u32 },
    TargetHealth { cmp: Cmp, health: u64 },
    MaxGroupMembers { count: u32 },
    InGroup,
    NotInGroup,
    TargetCreatureType { creature_type: u32 },
    TargetCreatureFamily { family: u32 },
    SourceDrunkValue { min: u32 },
    ReputationStanding { faction: u32, min: i32 },
    IsOnQuest { quest: u32 },
    CompletedQuest { quest: u32 },
    RewardedQuest { quest: u32 },
    HasAchievement { achievement: u32 },
    HasSpell { spell: u32 },
    ItemCount { item: u32, count: u64 },
    SkillLevel { skill: u32, min: u32 },
    HonorLevel { min: u32 },
    /// A condition kind the matcher does not understand. Never matches.
    Unknown { id: u32 },
}

/// Per-criterion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionFlags {
    /// Progress is shown as a bar client-side.
    pub show_progress_bar: bool,
    /// Hidden from the UI.
    pub hidden: bool,
    /// A matching fail event terminates the criterion (and its timed window).
    pub fail_on_condition: bool,
    /// Progress is zeroed whenever the originating activity (re)starts
    /// and when a timed window expires.
    pub reset_on_start: bool,
    /// Counter is interpreted as a date.
    pub is_date: bool,
    /// Counter is interpreted as money.
    pub money_counter: bool,
}

/// Which subjects a criterion advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionScopes {
    pub player: bool,
    pub account: bool,
    pub guild: bool,
}

impl Default for CriterionScopes {
    fn default() -> Self {
        Self {
            player: true,
            account: false,
            guild: false,
        }
    }
}

impl CriterionScopes {
    /// Player-only scope (the default).
    pub fn player_only() -> Self {
        Self::default()
    }

    /// Guild-only scope.
    pub fn guild_only() -> Self {
        Self {
            player: false,
            account: false,
            guild: true,
        }
    }
}

/// What starts the countdown of a timed criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimedType {
    /// An explicit scripted event with the given id.
    Event,
    /// Accepting the quest with the given entry.
    AcceptQuest,
    /// Casting the spell with the given entry.
    CastSpell,
    /// Being targeted by the spell with the given entry.
    BeSpellTarget,
    /// Killing the creature with the given entry.
    KillCreature,
    /// Using the item with the given entry.
    UseItem,
    /// A scenario advancing to the given stage.
    ScenarioStage,
}

/// Timed-window metadata for a timed criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWindow {
    /// What kind of start event opens the window.
    pub timed_type: TimedType,
    /// Asset the start event must carry (quest entry, spell id, ...).
    pub start_asset: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

/// An event that terminates a criterion as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailCondition {
    /// Subject must not die.
    NoDeath,
    /// Subject must not lose a battleground.
    NoLose,
    /// Subject must not be hit by the given spell.
    NoSpellHit { spell: u32 },
    /// Losing the given aura fails the criterion.
    RemoveAura { spell: u32 },
    /// Casting the given spell fails the criterion.
    CastSpell { spell: u32 },
    /// Leaving the group fails the criterion.
    LeaveGroup,
    /// A scripted event with the given id fails the criterion.
    OnEvent { event: u32 },
}

/// A criterion definition. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    /// Unique identifier.
    pub id: CriterionId,
    /// Activity kind this criterion tracks.
    pub ty: CriteriaType,
    /// Primary target asset (creature entry, spell id, zone id, ...).
    /// Zero means "any".
    #[serde(default)]
    pub asset: u64,
    /// Secondary asset, meaning depends on the kind.
    #[serde(default)]
    pub secondary_asset: u64,
    /// Tertiary asset, meaning depends on the kind.
    #[serde(default)]
    pub tertiary_asset: u64,
    /// Additional predicates; all must hold for an event to count.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Behavior flags.
    #[serde(default)]
    pub flags: CriterionFlags,
    /// Subjects this criterion advances.
    #[serde(default)]
    pub scopes: CriterionScopes,
    /// Event that terminates this criterion as failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_condition: Option<FailCondition>,
    /// Timed-window metadata; present only for timed criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed: Option<TimedWindow>,
}

impl Criterion {
    /// Create a criterion with the given id and kind; everything else defaulted.
    pub fn new(id: CriterionId, ty: CriteriaType) -> Self {
        Self {
            id,
            ty,
            asset: 0,
            secondary_asset: 0,
            tertiary_asset: 0,
            conditions: Vec::new(),
            flags: CriterionFlags::default(),
            scopes: CriterionScopes::default(),
            fail_condition: None,
            timed: None,
        }
    }

    /// Set the primary asset.
    pub fn with_asset(mut self, asset: u64) -> Self {
        self.asset = asset;
        self
    }

    /// Append an additional condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the flags.
    pub fn with_flags(mut self, flags: CriterionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the scopes.
    pub fn with_scopes(mut self, scopes: CriterionScopes) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the fail condition.
    pub fn with_fail_condition(mut self, fail: FailCondition) -> Self {
        self.fail_condition = Some(fail);
        self
    }

    /// Set the timed window.
    pub fn with_timed(mut self, timed: TimedWindow) -> Self {
        self.timed = Some(timed);
        self
    }

    /// Whether this criterion only accrues while a timed window is open.
    pub fn is_timed(&self) -> bool {
        self.timed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_type_display() {
        assert_eq!(CriteriaType::KillCreature.to_string(), "kill_creature");
        assert_eq!(
            "reach_level".parse::<CriteriaType>().unwrap(),
            CriteriaType::ReachLevel
        );
    }

    #[test]
    fn test_cmp_semantics() {
        assert!(Cmp::Equal.matches(5, 5));
        assert!(!Cmp::Equal.matches(5, 6));
        assert!(Cmp::Greater.matches(6, 5));
        assert!(Cmp::Lower.matches(4, 5));
        assert!(Cmp::Lower.matches_signed(-3, 0));
    }

    #[test]
    fn test_criterion_builder() {
        let criterion = Criterion::new(CriterionId(1), CriteriaType::KillCreature)
            .with_asset(42)
            .with_condition(Condition::TargetMustBeEnemy)
            .with_timed(TimedWindow {
                timed_type: TimedType::KillCreature,
                start_asset: 42,
                window_secs: 300,
            });

        assert_eq!(criterion.asset, 42);
        assert_eq!(criterion.conditions.len(), 1);
        assert!(criterion.is_timed());
    }

    #[test]
    fn test_condition_serde_roundtrip() {
        let condition = Condition::SourceLevel {
            cmp: Cmp::Greater,
            level: 60,
        };
        let json = serde_json::to_string(&condition).unwrap();
        assert!(json.contains("source_level"));
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(condition, back);
    }

    #[test]
    fn test_unknown_condition_preserved() {
        let condition = Condition::Unknown { id: 77 };
        let serialized = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, condition);
    }
}
